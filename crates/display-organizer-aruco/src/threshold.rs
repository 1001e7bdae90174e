//! Otsu thresholding.
//!
//! Thresholds returned here classify a sample as dark when `v <= t`.

pub(crate) fn histogram(samples: &[u8]) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    hist
}

/// Otsu threshold of a 256-bin histogram.
///
/// Returns `None` when all mass sits in a single bin (nothing to separate).
pub(crate) fn otsu_threshold(hist: &[u32; 256]) -> Option<u8> {
    let min_v = hist.iter().position(|&h| h > 0)?;
    let max_v = hist.iter().rposition(|&h| h > 0)?;
    if min_v == max_v {
        return None;
    }

    let nonzero_bins = hist.iter().filter(|&&h| h > 0).count();
    if nonzero_bins == 2 {
        return Some(((min_v + max_v) / 2) as u8);
    }

    let total: f64 = hist.iter().map(|&h| h as f64).sum();
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = min_v;

    for (t, &h) in hist.iter().enumerate().take(max_v) {
        w_b += h as f64;
        sum_b += t as f64 * h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;
        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t;
        }
    }

    Some(best_t as u8)
}

pub(crate) fn otsu_threshold_from_samples(samples: &[u8]) -> Option<u8> {
    otsu_threshold(&histogram(samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_samples_have_no_threshold() {
        assert_eq!(otsu_threshold_from_samples(&[90; 32]), None);
        assert_eq!(otsu_threshold_from_samples(&[]), None);
    }

    #[test]
    fn two_levels_split_in_the_middle() {
        let mut s = vec![0u8; 10];
        s.extend(vec![255u8; 30]);
        assert_eq!(otsu_threshold_from_samples(&s), Some(127));
    }

    #[test]
    fn three_levels_keep_darkest_below_threshold() {
        let mut s = vec![0u8; 100];
        s.extend(vec![90u8; 100]);
        s.extend(vec![255u8; 100]);
        let t = otsu_threshold_from_samples(&s).expect("threshold");
        // 0 is always dark under `v <= t`; white must stay above.
        assert!(t < 255);
    }
}
