use gradix_core::{
    buffer::HostBuffer,
    error::Result,
    kernel::PoolParams,
    layout::Layout,
};

use crate::kernels::conv::dims4;

pub(crate) fn max_pool(
    x: &HostBuffer,
    x_layout: &Layout,
    params: &PoolParams,
    out_layout: &Layout,
) -> Result<HostBuffer> {
    let x = x.to_f32_vec();
    let [batch, in_h, in_w, channels] = dims4(x_layout);
    let [_, out_h, out_w, _] = dims4(out_layout);
    let (wh, ww) = params.window;
    let (sh, sw) = params.stride;
    let (ph, pw) = params.padding;

    let mut out = vec![0.0f32; out_layout.size()];
    for b in 0..batch {
        for oh in 0..out_h {
            for ow in 0..out_w {
                for c in 0..channels {
                    let mut best = f32::NEG_INFINITY;
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
                            let v = x[((b * in_h + ih as usize) * in_w + iw as usize) * channels + c];
                            if v > best {
                                best = v;
                            }
                        }
                    }
                    out[((b * out_h + oh) * out_w + ow) * channels + c] = best;
                }
            }
        }
    }
    Ok(HostBuffer::F32(out))
}

/// Routes each upstream gradient to the first position that attained the
/// window maximum, gathered per input element.
pub(crate) fn max_pool_backprop(
    dy: &HostBuffer,
    dy_layout: &Layout,
    x: &HostBuffer,
    x_layout: &Layout,
    params: &PoolParams,
    out_layout: &Layout,
) -> Result<HostBuffer> {
    let dy = dy.to_f32_vec();
    let x = x.to_f32_vec();
    let [batch, in_h, in_w, channels] = dims4(x_layout);
    let [_, out_h, out_w, _] = dims4(dy_layout);
    let (wh, ww) = params.window;
    let (sh, sw) = params.stride;
    let (ph, pw) = params.padding;

    let mut out = vec![0.0f32; out_layout.size()];
    for b in 0..batch {
        for ih in 0..in_h {
            for iw in 0..in_w {
                for c in 0..channels {
                    let mut acc = 0.0f32;
                    for (oh, ow) in windows_covering(ih, iw, params, out_h, out_w) {
                        // Recompute the argmax of this window; ties go to the
                        // first cell in scan order.
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
                                let v = x[((b * in_h + xh as usize) * in_w + xw as usize) * channels + c];
                                if v > best {
                                    best = v;
                                    best_pos = (xh as usize, xw as usize);
                                }
                            }
                        }
                        if best_pos == (ih, iw) {
                            acc += dy[((b * out_h + oh) * out_w + ow) * channels + c];
                        }
                    }
                    out[((b * in_h + ih) * in_w + iw) * channels + c] = acc;
                }
            }
        }
    }
    Ok(HostBuffer::F32(out))
}

pub(crate) fn avg_pool(
    x: &HostBuffer,
    x_layout: &Layout,
    params: &PoolParams,
    out_layout: &Layout,
) -> Result<HostBuffer> {
    let x = x.to_f32_vec();
    let [batch, in_h, in_w, channels] = dims4(x_layout);
    let [_, out_h, out_w, _] = dims4(out_layout);
    let (wh, ww) = params.window;
    let (sh, sw) = params.stride;
    let (ph, pw) = params.padding;
    let area = (wh * ww) as f32;

    let mut out = vec![0.0f32; out_layout.size()];
    for b in 0..batch {
        for oh in 0..out_h {
            for ow in 0..out_w {
                for c in 0..channels {
                    let mut acc = 0.0f32;
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
                            acc += x[((b * in_h + ih as usize) * in_w + iw as usize) * channels + c];
                        }
                    }
                    out[((b * out_h + oh) * out_w + ow) * channels + c] = acc / area;
                }
            }
        }
    }
    Ok(HostBuffer::F32(out))
}

pub(crate) fn avg_pool_backprop(
    dy: &HostBuffer,
    dy_layout: &Layout,
    params: &PoolParams,
    out_layout: &Layout,
) -> Result<HostBuffer> {
    let dy = dy.to_f32_vec();
    let [batch, in_h, in_w, channels] = dims4(out_layout);
    let [_, out_h, out_w, _] = dims4(dy_layout);
    let (wh, ww) = params.window;
    let area = (wh * ww) as f32;

    let mut out = vec![0.0f32; out_layout.size()];
    for b in 0..batch {
        for ih in 0..in_h {
            for iw in 0..in_w {
                for c in 0..channels {
                    let mut acc = 0.0f32;
                    for (oh, ow) in windows_covering(ih, iw, params, out_h, out_w) {
                        acc += dy[((b * out_h + oh) * out_w + ow) * channels + c] / area;
                    }
                    out[((b * in_h + ih) * in_w + iw) * channels + c] = acc;
                }
            }
        }
    }
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
