use crate::kernels::Arg;
use gradix_core::{
    buffer::HostBuffer,
    error::Result,
    kernel::Conv2dParams,
    layout::Layout,
};
use rayon::prelude::*;

pub(crate) fn dims4(layout: &Layout) -> [usize; 4] {
    let s = layout.shape();
    [s[0], s[1], s[2], s[3]]
}

pub(crate) fn conv2d(
    x: Arg<'_>,
    filter: Arg<'_>,
    params: &Conv2dParams,
    out_layout: &Layout,
) -> Result<HostBuffer> {
    let x_data = x.0.to_f32_vec();
    let f_data = filter.0.to_f32_vec();
    let [_, in_h, in_w, in_c] = dims4(x.1);
    let [f_h, f_w, _, out_c] = dims4(filter.1);
    let [_, out_h, out_w, _] = dims4(out_layout);
    let (sh, sw) = params.stride;
    let (ph, pw) = params.padding;

    let out: Vec<f32> = (0..out_layout.size())
        .into_par_iter()
        .map(|idx| {
            let oc = idx % out_c;
            let ow = (idx / out_c) % out_w;
            let oh = (idx / (out_c * out_w)) % out_h;
            let b = idx / (out_c * out_w * out_h);

            let mut acc = 0.0f32;
            for kh in 0..f_h {
                let ih = (oh * sh + kh) as isize - ph as isize;
                if ih < 0 || ih as usize >= in_h {
                    continue;
                }
                for kw in 0..f_w {
                    let iw = (ow * sw + kw) as isize - pw as isize;
                    if iw < 0 || iw as usize >= in_w {
                        continue;
                    }
                    for c in 0..in_c {
                        let xv = x_data[((b * in_h + ih as usize) * in_w + iw as usize) * in_c + c];
                        let fv = f_data[((kh * f_w + kw) * in_c + c) * out_c + oc];
                        acc += xv * fv;
                    }
                }
            }
            acc
        })
        .collect();
    Ok(HostBuffer::F32(out))
}

pub(crate) fn backprop_input(
    dy: Arg<'_>,
    filter: Arg<'_>,
    params: &Conv2dParams,
    out_layout: &Layout,
) -> Result<HostBuffer> {
    let dy_data = dy.0.to_f32_vec();
    let f_data = filter.0.to_f32_vec();
    let [_, in_h, in_w, in_c] = dims4(out_layout);
    let [f_h, f_w, _, out_c] = dims4(filter.1);
    let [_, out_h, out_w, _] = dims4(dy.1);
    let (sh, sw) = params.stride;
    let (ph, pw) = params.padding;

    let out: Vec<f32> = (0..out_layout.size())
        .into_par_iter()
        .map(|idx| {
            let c = idx % in_c;
            let iw = (idx / in_c) % in_w;
            let ih = (idx / (in_c * in_w)) % in_h;
            let b = idx / (in_c * in_w * in_h);

            let mut acc = 0.0f32;
            for kh in 0..f_h {
                let oh_num = ih + ph;
                if oh_num < kh || (oh_num - kh) % sh != 0 {
                    continue;
                }
                let oh = (oh_num - kh) / sh;
                if oh >= out_h {
                    continue;
                }
                for kw in 0..f_w {
                    let ow_num = iw + pw;
                    if ow_num < kw || (ow_num - kw) % sw != 0 {
                        continue;
                    }
                    let ow = (ow_num - kw) / sw;
                    if ow >= out_w {
                        continue;
                    }
                    for oc in 0..out_c {
                        let gv = dy_data[((b * out_h + oh) * out_w + ow) * out_c + oc];
                        let fv = f_data[((kh * f_w + kw) * in_c + c) * out_c + oc];
                        acc += gv * fv;
                    }
                }
            }
            acc
        })
        .collect();
    Ok(HostBuffer::F32(out))
}

pub(crate) fn backprop_filter(
    x: Arg<'_>,
    dy: Arg<'_>,
    params: &Conv2dParams,
    out_layout: &Layout,
) -> Result<HostBuffer> {
    let x_data = x.0.to_f32_vec();
    let dy_data = dy.0.to_f32_vec();
    let [batch, in_h, in_w, in_c] = dims4(x.1);
    let [_, f_w, _, out_c] = dims4(out_layout);
    let [_, out_h, out_w, _] = dims4(dy.1);
    let (sh, sw) = params.stride;
    let (ph, pw) = params.padding;

    let out: Vec<f32> = (0..out_layout.size())
        .into_par_iter()
        .map(|idx| {
            let oc = idx % out_c;
            let c = (idx / out_c) % in_c;
            let kw = (idx / (out_c * in_c)) % f_w;
            let kh = idx / (out_c * in_c * f_w);

            let mut acc = 0.0f32;
            for b in 0..batch {
                for oh in 0..out_h {
                    let ih = (oh * sh + kh) as isize - ph as isize;
                    if ih < 0 || ih as usize >= in_h {
                        continue;
                    }
                    for ow in 0..out_w {
                        let iw = (ow * sw + kw) as isize - pw as isize;
                        if iw < 0 || iw as usize >= in_w {
                            continue;
                        }
                        let xv = x_data[((b * in_h + ih as usize) * in_w + iw as usize) * in_c + c];
                        let gv = dy_data[((b * out_h + oh) * out_w + ow) * out_c + oc];
                        acc += xv * gv;
                    }
                }
            }
            acc
        })
        .collect();
    Ok(HostBuffer::F32(out))
}
