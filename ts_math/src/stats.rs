//! Descriptive statistics, differencing and autoregressive estimation

use crate::{MathError, Result};

/// Arithmetic mean of a slice
pub fn mean(data: &[f64]) -> Result<f64> {
    if data.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot compute the mean of an empty series".to_string(),
        ));
    }
    Ok(data.iter().sum::<f64>() / data.len() as f64)
}

/// Sample variance (n - 1 denominator)
pub fn variance(data: &[f64]) -> Result<f64> {
    if data.len() < 2 {
        return Err(MathError::InsufficientData(
            "Need at least 2 observations for a sample variance".to_string(),
        ));
    }
    let m = mean(data)?;
    let ss: f64 = data.iter().map(|x| (x - m).powi(2)).sum();
    Ok(ss / (data.len() - 1) as f64)
}

/// Sample standard deviation
pub fn std_dev(data: &[f64]) -> Result<f64> {
    Ok(variance(data)?.sqrt())
}

/// Apply `order` rounds of first differencing.
///
/// Each round shortens the series by one observation.
pub fn difference(data: &[f64], order: usize) -> Vec<f64> {
    let mut result = data.to_vec();
    for _ in 0..order {
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Biased autocovariances (denominator n) for lags `0..=max_lag`, about the mean.
pub fn autocovariance(data: &[f64], max_lag: usize) -> Result<Vec<f64>> {
    let n = data.len();
    if n <= max_lag {
        return Err(MathError::InsufficientData(format!(
            "Need more than {} observations for {} autocovariance lags",
            max_lag, max_lag
        )));
    }

    let m = mean(data)?;
    let centered: Vec<f64> = data.iter().map(|x| x - m).collect();

    let acov = (0..=max_lag)
        .map(|k| {
            centered[k..]
                .iter()
                .zip(centered.iter())
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / n as f64
        })
        .collect();

    Ok(acov)
}

/// Solve the Yule-Walker equations with the Levinson-Durbin recursion.
///
/// `acov` holds autocovariances for lags `0..=order`. Returns the AR
/// coefficients and the innovation variance of the fitted AR(order).
pub fn levinson_durbin(acov: &[f64], order: usize) -> Result<(Vec<f64>, f64)> {
    if acov.len() <= order {
        return Err(MathError::InvalidInput(format!(
            "Need {} autocovariances for an AR({}) fit, got {}",
            order + 1,
            order,
            acov.len()
        )));
    }
    if acov[0] <= 0.0 {
        return Err(MathError::CalculationError(
            "Series has zero variance".to_string(),
        ));
    }

    let mut phi = vec![0.0; order];
    let mut sigma2 = acov[0];

    for k in 0..order {
        let mut acc = acov[k + 1];
        for j in 0..k {
            acc -= phi[j] * acov[k - j];
        }
        let reflection = acc / sigma2;

        let previous = phi.clone();
        phi[k] = reflection;
        for j in 0..k {
            phi[j] = previous[j] - reflection * previous[k - 1 - j];
        }

        sigma2 *= 1.0 - reflection * reflection;
        if sigma2 <= 0.0 {
            return Err(MathError::CalculationError(
                "Levinson-Durbin recursion lost positive definiteness".to_string(),
            ));
        }
    }

    Ok((phi, sigma2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_mean_and_std() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_approx_eq!(mean(&data).unwrap(), 5.0);
        assert_approx_eq!(variance(&data).unwrap(), 32.0 / 7.0);
        assert!(mean(&[]).is_err());
        assert!(std_dev(&[1.0]).is_err());
    }

    #[test]
    fn test_difference() {
        let data = [1.0, 4.0, 9.0, 16.0];
        assert_eq!(difference(&data, 0), data.to_vec());
        assert_eq!(difference(&data, 1), vec![3.0, 5.0, 7.0]);
        assert_eq!(difference(&data, 2), vec![2.0, 2.0]);
    }

    #[test]
    fn test_autocovariance_lag_zero_is_biased_variance() {
        let data = [1.0, 2.0, 3.0, 4.0];
        let acov = autocovariance(&data, 1).unwrap();
        assert_approx_eq!(acov[0], 1.25);
        // (-1.5*-0.5 + -0.5*0.5 + 0.5*1.5) / 4
        assert_approx_eq!(acov[1], 0.3125);
        assert!(autocovariance(&data, 4).is_err());
    }

    #[test]
    fn test_levinson_durbin_ar1() {
        // Theoretical AR(1) autocovariances with phi = 0.6, sigma2 = 1
        let phi = 0.6_f64;
        let g0 = 1.0 / (1.0 - phi * phi);
        let acov = [g0, phi * g0, phi * phi * g0];

        let (coeffs, sigma2) = levinson_durbin(&acov, 2).unwrap();
        assert_approx_eq!(coeffs[0], 0.6, 1e-10);
        assert_approx_eq!(coeffs[1], 0.0, 1e-10);
        assert_approx_eq!(sigma2, 1.0, 1e-10);
    }

    #[test]
    fn test_levinson_durbin_on_simulated_ar1() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;
        use rand_distr::{Distribution, Normal};

        let mut rng = StdRng::seed_from_u64(7);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let mut x = 0.0;
        let data: Vec<f64> = (0..5000)
            .map(|_| {
                x = 0.5 * x + noise.sample(&mut rng);
                x
            })
            .collect();

        let acov = autocovariance(&data, 1).unwrap();
        let (coeffs, sigma2) = levinson_durbin(&acov, 1).unwrap();
        assert_approx_eq!(coeffs[0], 0.5, 0.05);
        assert_approx_eq!(sigma2, 1.0, 0.1);
    }

    #[test]
    fn test_levinson_durbin_rejects_zero_variance() {
        assert!(levinson_durbin(&[0.0, 0.0], 1).is_err());
    }
}
