//! Least-squares slope of `log N` against `log r`: the box-counting
//! dimension estimate.

use sweep::Measurement;

/// A fitted line `y = slope * x + intercept`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Fit {
    /// The dimension estimate when fitted to box counts.
    pub slope: f64,
    /// Where the line crosses `x = 0`.
    pub intercept: f64,
    /// Coefficient of determination.  A perfectly flat series counts
    /// as a perfect fit.
    pub r_squared: f64,
    /// Number of points that went into the fit.
    pub points: usize,
}

/// Ordinary least squares over the finite points.  `None` when fewer than
/// two remain or they all share one `x`.
pub fn fit_line(points: &[(f64, f64)]) -> Option<Fit> {
    let finite: Vec<(f64, f64)> = points
        .iter()
        .cloned()
        .filter(|&(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if finite.len() < 2 {
        return None;
    }
    let n = finite.len() as f64;
    let mean_x = finite.iter().map(|&(x, _)| x).sum::<f64>() / n;
    let mean_y = finite.iter().map(|&(_, y)| y).sum::<f64>() / n;

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in &finite {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let r_squared = if syy == 0.0 { 1.0 } else { (sxy * sxy) / (sxx * syy) };
    Some(Fit {
        slope,
        intercept,
        r_squared,
        points: finite.len(),
    })
}

/// Fits `log N` against `log r`.  Levels with no occupied boxes drop out.
pub fn fit_dimension(measurements: &[Measurement]) -> Option<Fit> {
    let points: Vec<(f64, f64)> = measurements
        .iter()
        .map(|m| (m.log_r(), m.log_n()))
        .collect();
    fit_line(&points)
}

/// Splits an accumulated table into runs, in the order each run first
/// appears.  A row continues the latest run with its scale and iteration
/// count when its resolution is half of that run's last one; any other
/// row starts a new run.
pub fn group_runs(measurements: &[Measurement]) -> Vec<Vec<Measurement>> {
    let mut runs: Vec<Vec<Measurement>> = Vec::new();
    for m in measurements {
        let key = (m.scale.to_bits(), m.iterations);
        let latest = runs
            .iter()
            .rposition(|run| (run[0].scale.to_bits(), run[0].iterations) == key);
        match latest {
            Some(index) if runs[index][runs[index].len() - 1].resolution == 2 * m.resolution => {
                runs[index].push(*m)
            }
            _ => runs.push(vec![*m]),
        }
    }
    runs
}
