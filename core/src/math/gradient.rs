/// Discrete derivative of `values` with respect to `coords`.
///
/// Interior points use second-order central differences that account for
/// non-uniform spacing; the two end points use one-sided first differences.
/// Sequences shorter than two samples have a zero derivative.
pub fn gradient(values: &[f64], coords: &[f64]) -> Vec<f64> {
    let n = values.len().min(coords.len());
    if n < 2 {
        return vec![0.0; n];
    }

    let mut out = Vec::with_capacity(n);
    out.push((values[1] - values[0]) / (coords[1] - coords[0]));
    for i in 1..n - 1 {
        let hs = coords[i] - coords[i - 1];
        let hd = coords[i + 1] - coords[i];
        let numerator =
            hs * hs * values[i + 1] + (hd * hd - hs * hs) * values[i] - hd * hd * values[i - 1];
        out.push(numerator / (hs * hd * (hd + hs)));
    }
    out.push((values[n - 1] - values[n - 2]) / (coords[n - 1] - coords[n - 2]));
    out
}
