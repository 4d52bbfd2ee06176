use gradix_core::{
    buffer::HostBuffer,
    error::Result,
    kernel::Conv2dParams,
    layout::Layout,
};

/// NHWC forward convolution, direct gather per output element.
pub(crate) fn conv2d(
    x: &HostBuffer,
    x_layout: &Layout,
    filter: &HostBuffer,
    f_layout: &Layout,
    params: &Conv2dParams,
    out_layout: &Layout,
) -> Result<HostBuffer> {
    let x = x.to_f32_vec();
    let filter = filter.to_f32_vec();

    let [batch, in_h, in_w, in_c] = dims4(x_layout);
    let [f_h, f_w, _, out_c] = dims4(f_layout);
    let [_, out_h, out_w, _] = dims4(out_layout);
    let (sh, sw) = params.stride;
    let (ph, pw) = params.padding;

    let mut out = vec![0.0f32; out_layout.size()];
    for b in 0..batch {
        for oh in 0..out_h {
            for ow in 0..out_w {
                for oc in 0..out_c {
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
                                let xv = x[((b * in_h + ih as usize) * in_w + iw as usize) * in_c + c];
                                let fv = filter[((kh * f_w + kw) * in_c + c) * out_c + oc];
                                acc += xv * fv;
                            }
                        }
                    }
                    out[((b * out_h + oh) * out_w + ow) * out_c + oc] = acc;
                }
            }
        }
    }
    Ok(HostBuffer::F32(out))
}

/// Gradient with respect to the input, gathered per input element so the
/// parallel backend can reproduce the exact summation order.
pub(crate) fn backprop_input(
    dy: &HostBuffer,
    dy_layout: &Layout,
    filter: &HostBuffer,
    f_layout: &Layout,
    params: &Conv2dParams,
    out_layout: &Layout,
) -> Result<HostBuffer> {
    let dy = dy.to_f32_vec();
    let filter = filter.to_f32_vec();

    let [batch, in_h, in_w, in_c] = dims4(out_layout);
    let [f_h, f_w, _, out_c] = dims4(f_layout);
    let [_, out_h, out_w, _] = dims4(dy_layout);
    let (sh, sw) = params.stride;
    let (ph, pw) = params.padding;

    let mut out = vec![0.0f32; out_layout.size()];
    for b in 0..batch {
        for ih in 0..in_h {
            for iw in 0..in_w {
                for c in 0..in_c {
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
                                let gv = dy[((b * out_h + oh) * out_w + ow) * out_c + oc];
                                let fv = filter[((kh * f_w + kw) * in_c + c) * out_c + oc];
                                acc += gv * fv;
                            }
                        }
                    }
                    out[((b * in_h + ih) * in_w + iw) * in_c + c] = acc;
                }
            }
        }
    }
    Ok(HostBuffer::F32(out))
}

/// Gradient with respect to the filter, gathered per filter element.
pub(crate) fn backprop_filter(
    x: &HostBuffer,
    x_layout: &Layout,
    dy: &HostBuffer,
    dy_layout: &Layout,
    params: &Conv2dParams,
    out_layout: &Layout,
) -> Result<HostBuffer> {
    let x = x.to_f32_vec();
    let dy = dy.to_f32_vec();

    let [batch, in_h, in_w, in_c] = dims4(x_layout);
    let [f_h, f_w, _, out_c] = dims4(out_layout);
    let [_, out_h, out_w, _] = dims4(dy_layout);
    let (sh, sw) = params.stride;
    let (ph, pw) = params.padding;

    let mut out = vec![0.0f32; out_layout.size()];
    for kh in 0..f_h {
        for kw in 0..f_w {
            for c in 0..in_c {
                for oc in 0..out_c {
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
                                let xv = x[((b * in_h + ih as usize) * in_w + iw as usize) * in_c + c];
                                let gv = dy[((b * out_h + oh) * out_w + ow) * out_c + oc];
                                acc += xv * gv;
                            }
                        }
                    }
                    out[((kh * f_w + kw) * in_c + c) * out_c + oc] = acc;
                }
            }
        }
    }
    Ok(HostBuffer::F32(out))
}

pub(crate) fn dims4(layout: &Layout) -> [usize; 4] {
    let s = layout.shape();
    [s[0], s[1], s[2], s[3]]
}
