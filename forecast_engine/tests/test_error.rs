use forecast_engine::error::ForecastError;
use std::io;

#[test]
fn test_error_conversion() {
    // Test IO error conversion
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let forecast_error = ForecastError::from(io_error);
    assert!(matches!(forecast_error, ForecastError::IoError(_)));

    // Test numerical error conversion
    let math_error = ts_math::MathError::CalculationError("singular".to_string());
    let forecast_error = ForecastError::from(math_error);
    assert!(matches!(forecast_error, ForecastError::MathError(_)));
}

#[test]
fn test_error_display() {
    let error = ForecastError::ConfigurationError("FRED_API_KEY not set".to_string());
    assert_eq!(error.to_string(), "Configuration error: FRED_API_KEY not set");

    let error = ForecastError::UpstreamError("UNRATE series is empty".to_string());
    assert!(error.to_string().contains("Upstream error"));
    assert!(error.is_upstream());

    let error = ForecastError::ForecastingError("did not converge".to_string());
    assert!(error.to_string().starts_with("Forecasting error"));
    assert!(!error.is_upstream());
}

#[test]
fn test_result_mapping() {
    let result: Result<(), &str> = Err("bad date");
    let mapped = result.map_err(|e| ForecastError::DataError(e.to_string()));

    if let Err(ForecastError::DataError(msg)) = mapped {
        assert_eq!(msg, "bad date");
    } else {
        panic!("Wrong error variant");
    }
}
