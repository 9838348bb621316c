use forecast_engine::data::{TimeSeriesData, YearMonth};
use forecast_engine::models::arima::ArimaModel;
use forecast_engine::models::{ForecastModel, TrainedForecastModel};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Forecast Engine: Basic Forecasting Example");
    println!("==========================================\n");

    // Create sample data
    println!("Creating sample data...");
    let data = create_sample_monthly_data()?;
    println!(
        "Sample data created: {} monthly points ending {}\n",
        data.len(),
        data.last().map(|p| p.period.to_string()).unwrap_or_default()
    );

    // Fit the model
    println!("Training ARIMA(2,1,2)...");
    let model = ArimaModel::new(2, 1, 2)?;
    let trained = model.train(&data)?;
    println!("AR coefficients: {:?}", trained.ar_coefficients());
    println!("MA coefficients: {:?}", trained.ma_coefficients());
    println!("Innovation variance: {:.5}\n", trained.sigma2());

    // Generate forecast
    let forecast = trained.forecast_one_step()?;
    let (lower, upper) = forecast.interval(0.95)?;
    println!(
        "Forecast for next month: {:.3} (95% interval {:.3} .. {:.3})",
        forecast.mean, lower, upper
    );

    // The same thing through the engine entry point
    let result = forecast_engine::forecast_next(&data)?;
    println!(
        "\nEngine result: {} -> {:.3} [{}]",
        result.forecast_month, result.forecast_value, result.model
    );

    Ok(())
}

// Helper function to create a smooth unemployment-like series
fn create_sample_monthly_data() -> Result<TimeSeriesData, Box<dyn std::error::Error>> {
    let values: Vec<f64> = (0..120)
        .map(|i| {
            let t = i as f64;
            4.5 + 0.8 * (t / 18.0).sin() + 0.05 * (t / 2.0).cos()
        })
        .collect();

    Ok(TimeSeriesData::monthly_from(YearMonth::new(2015, 1)?, &values)?)
}
