// tests/simulation_export.rs
//! Response simulation of designed filters and text export

use gsv_core::config::SessionConfig;
use gsv_core::error::ErrorKind;
use gsv_core::processing::dfilter::{
    save_points, simulate, Cutoff, ExportFormat, FilterCoefficients, FilterDesigner, FilterDomain, FilterShape, FilterSpec,
    SimulationMode, SimulationRequest, Spacing,
};
use tempfile::tempdir;

fn lowpass_designer() -> FilterDesigner {
    let mut designer = FilterDesigner::new();
    designer
        .design(&FilterSpec::iir(FilterShape::LowPass, Cutoff::Single(0.1)))
        .unwrap();
    designer
}

#[test]
fn simulate_before_design_is_not_initialized() {
    let designer = FilterDesigner::new();
    let request = SimulationRequest::frequency_response(0.0, 100.0, 1000.0, 10);
    for domain in [FilterDomain::Iir, FilterDomain::Fir] {
        let err = designer.simulate(domain, &request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInitialized);
        assert_eq!(err.code(), 0x3000_0201);
    }
}

#[test]
fn failed_design_does_not_initialize_simulation() {
    let mut designer = FilterDesigner::new();
    let rejected = FilterSpec::iir(FilterShape::LowPass, Cutoff::Single(0.001));
    assert!(designer.design(&rejected).is_err());

    let request = SimulationRequest::step_response(0.0, 1.0, 10);
    assert_eq!(
        designer.simulate(FilterDomain::Iir, &request).unwrap_err().kind(),
        ErrorKind::NotInitialized
    );
}

#[test]
fn lowpass_is_three_db_down_at_cutoff() {
    let designer = lowpass_designer();
    let request = SimulationRequest::frequency_response(0.0, 100.0, 1000.0, 11);
    let points = designer.simulate(FilterDomain::Iir, &request).unwrap();

    assert_eq!(points.len(), 11);
    assert!((points[0].y - 1.0).abs() < 1e-9);
    assert!((points[10].x - 100.0).abs() < 1e-9);
    assert!((points[10].y - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    assert!(points.windows(2).all(|w| w[0].y >= w[1].y));
    assert!(points.iter().all(|p| p.phase.is_some()));
}

#[test]
fn step_response_settles_at_end_level() {
    let designer = lowpass_designer();
    let request = SimulationRequest::step_response(-1.0, 2.0, 300);
    let points = designer.simulate(FilterDomain::Iir, &request).unwrap();

    assert_eq!(points.len(), 300);
    assert!((points[0].y - 2.0).abs() > 0.5);
    assert!((points[299].y - 2.0).abs() < 1e-6);
    assert_eq!(points[299].x, 299.0);
}

#[test]
fn fir_step_response_reaches_gain_after_its_length() {
    let mut designer = FilterDesigner::new();
    designer
        .design(&FilterSpec::fir(FilterShape::LowPass, 8, Cutoff::Single(0.1)))
        .unwrap();
    let points = designer
        .simulate(FilterDomain::Fir, &SimulationRequest::step_response(0.0, 1.0, 12))
        .unwrap();
    for point in &points[7..] {
        assert!((point.y - 1.0).abs() < 1e-12);
    }
}

#[test]
fn logarithmic_grid_and_mode_codes() {
    let designer = lowpass_designer();
    let request = SimulationRequest::frequency_response(1.0, 100.0, 1000.0, 5).with_spacing(Spacing::Logarithmic);
    let points = designer.simulate(FilterDomain::Iir, &request).unwrap();
    let expected = [1.0, 10f64.sqrt(), 10.0, 10f64.powf(1.5), 100.0];
    for (point, f) in points.iter().zip(expected) {
        assert!((point.x - f).abs() < 1e-9 * f);
    }

    assert_eq!(
        SimulationMode::from_code(0x81).unwrap(),
        (SimulationMode::FrequencyResponse, FilterDomain::Fir)
    );
}

#[test]
fn invalid_frequency_range_is_rejected() {
    let designer = lowpass_designer();
    let request = SimulationRequest::frequency_response(0.0, 600.0, 1000.0, 10);
    let err = designer.simulate(FilterDomain::Iir, &request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OptionsInvalid);
}

#[test]
fn export_writes_records_in_increasing_x() {
    let designer = lowpass_designer();
    let coeffs = designer.last_design(FilterDomain::Iir).unwrap().coefficients.clone();
    let mut points = simulate(&coeffs, &SimulationRequest::step_response(0.0, 1.0, 20)).unwrap();
    points.reverse();

    let dir = tempdir().unwrap();
    let path = dir.path().join("step.csv");
    save_points(&path, &points, ExportFormat::Delimited { delimiter: ',' }).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("x,y"));
    let xs: Vec<f64> = lines
        .map(|line| line.split(',').next().unwrap().parse().unwrap())
        .collect();
    assert_eq!(xs, (0..20).map(|i| i as f64).collect::<Vec<_>>());
}

#[test]
fn export_to_missing_directory_fails_with_io() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing").join("out.csv");
    let designer = lowpass_designer();
    let points = designer
        .simulate(FilterDomain::Iir, &SimulationRequest::step_response(0.0, 1.0, 2))
        .unwrap();
    let err = save_points(&path, &points, ExportFormat::Json).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn configured_designer_exports_with_configured_delimiter() {
    let mut config = SessionConfig::default();
    config.simulation.export_delimiter = '\t';
    config.simulation.spacing = Spacing::Logarithmic;

    let mut designer = FilterDesigner::from_config(&config);
    designer
        .design(&FilterSpec::iir(FilterShape::LowPass, Cutoff::Single(0.1)))
        .unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("response.txt");
    let request = SimulationRequest::step_response(0.0, 1.0, 5);
    assert_eq!(designer.export_simulation(FilterDomain::Iir, &request, &path).unwrap(), 5);
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("x\ty\n"));

    let points = designer
        .simulate_frequency(FilterDomain::Iir, 1.0, 100.0, 1000.0, 3)
        .unwrap();
    assert!((points[1].x - 10.0).abs() < 1e-9);
}

#[test]
fn empty_fir_taps_are_rejected_instead_of_run() {
    let empty = FilterCoefficients::Fir { taps: Vec::new() };
    let err = simulate(&empty, &SimulationRequest::step_response(0.0, 1.0, 8)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OptionsInvalid);
}
