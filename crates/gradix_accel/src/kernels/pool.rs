use crate::kernels::{conv::dims4, Arg};
use gradix_core::{
    buffer::HostBuffer,
    error::Result,
    kernel::PoolParams,
    layout::Layout,
};
use rayon::prelude::*;

pub(crate) fn max_pool(x: Arg<'_>, params: &PoolParams, out_layout: &Layout) -> Result<HostBuffer> {
    pool(x, params, out_layout, true)
}

pub(crate) fn avg_pool(x: Arg<'_>, params: &PoolParams, out_layout: &Layout) -> Result<HostBuffer> {
    pool(x, params, out_layout, false)
}

fn pool(x: Arg<'_>, params: &PoolParams, out_layout: &Layout, take_max: bool) -> Result<HostBuffer> {
    let data = x.0.to_f32_vec();
    let [_, in_h, in_w, channels] = dims4(x.1);
    let [_, out_h, out_w, _] = dims4(out_layout);
    let (wh, ww) = params.window;
    let (sh, sw) = params.stride;
    let (ph, pw) = params.padding;
    let area = (wh * ww) as f32;

    let out: Vec<f32> = (0..out_layout.size())
        .into_par_iter()
        .map(|idx| {
            let c = idx % channels;
            let ow = (idx / channels) % out_w;
            let oh = (idx / (channels * out_w)) % out_h;
            let b = idx / (channels * out_w * out_h);

            let mut acc = if take_max { f32::NEG_INFINITY } else { 0.0 };
            for kh in 0..wh {
                let ih = (oh * sh + kh) as isize - ph as isize;
                if ih < 0 || ih as usize >= in_h {
                    continue;
                }
                for kw in 0..ww {
                    let iw = (ow * sw + kw) as isize - pw as isize;
                    if iw < 0 || iw as usize >= in_w {
                        continue;
                    }
                    let v = data[((b * in_h + ih as usize) * in_w + iw as usize) * channels + c];
                    acc = if take_max { acc.max(v) } else { acc + v };
                }
            }
            if take_max {
                acc
            } else {
                acc / area
            }
        })
        .collect();
    Ok(HostBuffer::F32(out))
}

pub(crate) fn max_pool_backprop(
    dy: Arg<'_>,
    x: Arg<'_>,
    params: &PoolParams,
    out_layout: &Layout,
) -> Result<HostBuffer> {
    let dy_data = dy.0.to_f32_vec();
    let x_data = x.0.to_f32_vec();
    let [_, in_h, in_w, channels] = dims4(x.1);
    let [_, out_h, out_w, _] = dims4(dy.1);
    let (wh, ww) = params.window;
    let (sh, sw) = params.stride;
    let (ph, pw) = params.padding;

    let out: Vec<f32> = (0..out_layout.size())
        .into_par_iter()
        .map(|idx| {
            let c = idx % channels;
            let iw = (idx / channels) % in_w;
            let ih = (idx / (channels * in_w)) % in_h;
            let b = idx / (channels * in_w * in_h);

            let mut acc = 0.0f32;
            for (oh, ow) in windows_covering(ih, iw, params, out_h, out_w) {
                // Ties resolve to the first cell in scan order, matching
                // the reference backend.
                let mut best = f32::NEG_INFINITY;
                let mut best_pos = (0usize, 0usize);
                for kh in 0..wh {
                    let xh = (oh * sh + kh) as isize - ph as isize;
                    if xh < 0 || xh as usize >= in_h {
                        continue;
                    }
                    for kw in 0..ww {
                        let xw = (ow * sw + kw) as isize - pw as isize;
                        if xw < 0 || xw as usize >= in_w {
                            continue;
                        }
                        let v = x_data[((b * in_h + xh as usize) * in_w + xw as usize) * channels + c];
                        if v > best {
                            best = v;
                            best_pos = (xh as usize, xw as usize);
                        }
                    }
                }
                if best_pos == (ih, iw) {
                    acc += dy_data[((b * out_h + oh) * out_w + ow) * channels + c];
                }
            }
            acc
        })
        .collect();
    Ok(HostBuffer::F32(out))
}

pub(crate) fn avg_pool_backprop(
    dy: Arg<'_>,
    params: &PoolParams,
    out_layout: &Layout,
) -> Result<HostBuffer> {
    let dy_data = dy.0.to_f32_vec();
    let [_, in_h, in_w, channels] = dims4(out_layout);
    let [_, out_h, out_w, _] = dims4(dy.1);
    let (wh, ww) = params.window;
    let area = (wh * ww) as f32;

    let out: Vec<f32> = (0..out_layout.size())
        .into_par_iter()
        .map(|idx| {
            let c = idx % channels;
            let iw = (idx / channels) % in_w;
            let ih = (idx / (channels * in_w)) % in_h;
            let b = idx / (channels * in_w * in_h);

            let mut acc = 0.0f32;
            for (oh, ow) in windows_covering(ih, iw, params, out_h, out_w) {
                acc += dy_data[((b * out_h + oh) * out_w + ow) * channels + c] / area;
            }
            acc
        })
        .collect();
    Ok(HostBuffer::F32(out))
}

/// Output positions whose window covers input cell (ih, iw).
fn windows_covering(
    ih: usize,
    iw: usize,
    params: &PoolParams,
    out_h: usize,
    out_w: usize,
) -> Vec<(usize, usize)> {
    let (wh, ww) = params.window;
    let (sh, sw) = params.stride;
    let (ph, pw) = params.padding;
    let mut hits = Vec::new();
    for kh in 0..wh {
        let oh_num = ih + ph;
        if oh_num < kh || (oh_num - kh) % sh != 0 {
            continue;
        }
        let oh = (oh_num - kh) / sh;
        if oh >= out_h {
            continue;
        }
        for kw in 0..ww {
            let ow_num = iw + pw;
            if ow_num < kw || (ow_num - kw) % sw != 0 {
                continue;
            }
            let ow = (ow_num - kw) / sw;
            if ow >= out_w {
                continue;
            }
            hits.push((oh, ow));
        }
    }
    hits
}
