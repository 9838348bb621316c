//! Derivative-free minimization with the Nelder-Mead simplex method

use crate::{MathError, Result};

/// Outcome of a minimization
#[derive(Debug, Clone)]
pub struct OptimizeResult {
    /// Best point found
    pub x: Vec<f64>,
    /// Objective value at `x`
    pub value: f64,
    /// Number of simplex iterations performed
    pub iterations: usize,
    /// Whether the tolerance test was met before the iteration limit
    pub converged: bool,
}

/// Nelder-Mead simplex optimizer
#[derive(Debug, Clone)]
pub struct NelderMead {
    max_iterations: usize,
    f_tolerance: f64,
    x_tolerance: f64,
    initial_step: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            f_tolerance: 1e-10,
            x_tolerance: 1e-8,
            initial_step: 0.25,
        }
    }
}

// Standard reflection, expansion, contraction and shrink coefficients
const ALPHA: f64 = 1.0;
const GAMMA: f64 = 2.0;
const RHO: f64 = 0.5;
const SIGMA: f64 = 0.5;

impl NelderMead {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerances(mut self, f_tolerance: f64, x_tolerance: f64) -> Self {
        self.f_tolerance = f_tolerance;
        self.x_tolerance = x_tolerance;
        self
    }

    pub fn with_initial_step(mut self, step: f64) -> Self {
        self.initial_step = step;
        self
    }

    /// Minimize `f` starting from `x0`.
    ///
    /// Non-finite objective values are treated as `+inf`, so the simplex
    /// moves away from regions where the objective cannot be evaluated.
    /// Fails only when no finite value was ever observed.
    pub fn minimize<F>(&self, mut f: F, x0: &[f64]) -> Result<OptimizeResult>
    where
        F: FnMut(&[f64]) -> f64,
    {
        let n = x0.len();
        if n == 0 {
            return Err(MathError::InvalidInput(
                "Cannot optimize over zero parameters".to_string(),
            ));
        }
        if self.initial_step <= 0.0 {
            return Err(MathError::InvalidInput(
                "Initial simplex step must be positive".to_string(),
            ));
        }

        let mut eval = |x: &[f64]| {
            let v = f(x);
            if v.is_finite() {
                v
            } else {
                f64::INFINITY
            }
        };

        let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
        simplex.push(x0.to_vec());
        for i in 0..n {
            let mut vertex = x0.to_vec();
            vertex[i] += self.initial_step;
            simplex.push(vertex);
        }
        let mut values: Vec<f64> = simplex.iter().map(|x| eval(x)).collect();

        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            order_simplex(&mut simplex, &mut values);

            if self.has_converged(&simplex, &values) {
                converged = true;
                break;
            }
            iterations += 1;

            let worst = n;
            let centroid: Vec<f64> = (0..n)
                .map(|j| simplex[..n].iter().map(|v| v[j]).sum::<f64>() / n as f64)
                .collect();

            let reflected = affine(&centroid, &simplex[worst], ALPHA);
            let f_reflected = eval(&reflected);

            if f_reflected < values[0] {
                let expanded = affine(&centroid, &simplex[worst], GAMMA);
                let f_expanded = eval(&expanded);
                if f_expanded < f_reflected {
                    simplex[worst] = expanded;
                    values[worst] = f_expanded;
                } else {
                    simplex[worst] = reflected;
                    values[worst] = f_reflected;
                }
                continue;
            }

            if f_reflected < values[n - 1] {
                simplex[worst] = reflected;
                values[worst] = f_reflected;
                continue;
            }

            // Contract towards the better of the worst point and its reflection
            let (contracted, f_contracted) = if f_reflected < values[worst] {
                let c = affine(&centroid, &simplex[worst], RHO);
                let fc = eval(&c);
                (c, fc)
            } else {
                let c = affine(&centroid, &simplex[worst], -RHO);
                let fc = eval(&c);
                (c, fc)
            };

            if f_contracted < values[worst].min(f_reflected) {
                simplex[worst] = contracted;
                values[worst] = f_contracted;
                continue;
            }

            let best = simplex[0].clone();
            for i in 1..=n {
                for j in 0..n {
                    simplex[i][j] = best[j] + SIGMA * (simplex[i][j] - best[j]);
                }
                values[i] = eval(&simplex[i]);
            }
        }

        order_simplex(&mut simplex, &mut values);
        if !values[0].is_finite() {
            return Err(MathError::CalculationError(
                "Objective was not finite at any simplex vertex".to_string(),
            ));
        }

        Ok(OptimizeResult {
            x: simplex[0].clone(),
            value: values[0],
            iterations,
            converged,
        })
    }

    fn has_converged(&self, simplex: &[Vec<f64>], values: &[f64]) -> bool {
        let best = values[0];
        let worst = values[values.len() - 1];
        if !worst.is_finite() {
            return false;
        }
        let f_spread = (worst - best).abs();
        if f_spread > self.f_tolerance * (1.0 + best.abs()) {
            return false;
        }

        let x_spread = simplex[1..]
            .iter()
            .flat_map(|v| v.iter().zip(simplex[0].iter()).map(|(a, b)| (a - b).abs()))
            .fold(0.0_f64, f64::max);
        // A flat objective with a wide simplex still counts: the value cannot improve
        x_spread <= self.x_tolerance || f_spread == 0.0 || f_spread <= self.f_tolerance * 1e-3
    }
}

/// `centroid + coef * (centroid - point)`
fn affine(centroid: &[f64], point: &[f64], coef: f64) -> Vec<f64> {
    centroid
        .iter()
        .zip(point.iter())
        .map(|(c, p)| c + coef * (c - p))
        .collect()
}

fn order_simplex(simplex: &mut Vec<Vec<f64>>, values: &mut Vec<f64>) {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    *simplex = idx.iter().map(|&i| simplex[i].clone()).collect();
    *values = idx.iter().map(|&i| values[i]).collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadratic_bowl() {
        let result = NelderMead::new()
            .minimize(|x| (x[0] - 3.0).powi(2) + (x[1] + 1.0).powi(2), &[0.0, 0.0])
            .unwrap();

        assert!(result.converged);
        assert!((result.x[0] - 3.0).abs() < 1e-3);
        assert!((result.x[1] + 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_rosenbrock() {
        let rosenbrock = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        let result = NelderMead::new()
            .with_max_iterations(20_000)
            .minimize(rosenbrock, &[-1.2, 1.0])
            .unwrap();

        assert!((result.x[0] - 1.0).abs() < 1e-2);
        assert!((result.x[1] - 1.0).abs() < 1e-2);
        assert!(result.value < 1e-4);
    }

    #[test]
    fn test_non_finite_regions_are_avoided() {
        // Undefined for x <= 0
        let f = |x: &[f64]| (x[0].ln() - 1.0).powi(2);
        let result = NelderMead::new().minimize(f, &[0.1]).unwrap();
        assert!((result.x[0] - std::f64::consts::E).abs() < 1e-2);
    }

    #[test]
    fn test_empty_parameter_vector() {
        assert!(NelderMead::new().minimize(|_| 0.0, &[]).is_err());
    }

    #[test]
    fn test_initial_step() {
        let bowl = |x: &[f64]| (x[0] - 40.0).powi(2);
        assert!(NelderMead::new()
            .with_initial_step(0.0)
            .minimize(bowl, &[0.0])
            .is_err());

        let result = NelderMead::new()
            .with_initial_step(10.0)
            .minimize(bowl, &[0.0])
            .unwrap();
        assert!(result.converged);
        assert!((result.x[0] - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_iteration_limit_reports_not_converged() {
        let result = NelderMead::new()
            .with_max_iterations(2)
            .minimize(|x| x[0].powi(2) + x[1].powi(2), &[5.0, 5.0])
            .unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 2);
    }
}
