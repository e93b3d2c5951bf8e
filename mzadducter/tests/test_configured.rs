use clap::{CommandFactory, Parser};
use figment::{
    providers::{Format, Toml},
    Figment,
};

use mzadducter::{ArgAdduct, BuiltinAdduct, MZAdducter, OutputFormat, TimeRange};

#[test_log::test]
fn test_defaults_agree() {
    let parsed = MZAdducter::parse_from(["mzadducter", "run.mzML", "-f", "C12H11N"]);
    let expected = MZAdducter {
        input_file: "run.mzML".into(),
        analyte: "C12H11N".into(),
        ..Default::default()
    };
    assert_eq!(parsed, expected);
    assert_eq!(parsed.adducts().len(), 2);
    assert_eq!(parsed.peak_finder_params(), mzadduct::PeakFinderParams::default());
}

#[test_log::test]
fn test_toml_config() {
    let config = Figment::from(Toml::string(
        r#"
input_file = "run.mzML"
analyte = "C12H11N"
adducts = ["plus-h", "[%s + K]⁺:K:add"]
output_format = "json"
min_area = 250.0
points = 5
time_range = { start = 5.0, end = 12.5 }
"#,
    ));
    let driver: MZAdducter = config.extract().unwrap();
    assert_eq!(driver.output_format, OutputFormat::Json);
    assert_eq!(driver.time_range, Some(TimeRange::new(5.0, 12.5)));
    assert_eq!(driver.adducts[0], ArgAdduct::Builtin(BuiltinAdduct::PlusH));
    let adducts = driver.adducts();
    assert_eq!(adducts[1].label("M"), "[M + K]⁺");

    let params = driver.peak_finder_params();
    assert_eq!(params.points, 5);
    assert_eq!(params.min_area, 250.0);
    assert_eq!(params.min_ions, 2);
}

#[test_log::test]
fn test_command_line_overrides_config() {
    let matches = MZAdducter::command().get_matches_from([
        "mzadducter",
        "run.mzML",
        "-f",
        "C6H6",
        "-a",
        "plus-sodium",
        "-n",
        "3",
        "--points",
        "5",
        "-r",
        "5-",
    ]);
    let config = Figment::from(Toml::string(
        r#"
analyte = "C12H11N"
min_ions = 4
points = 7
min_width = 6
left_tolerance = 0.25
adducts = ["plus-h"]
"#,
    ));
    let driver = MZAdducter::configure(&matches, config).unwrap();
    assert_eq!(driver.input_file, "run.mzML");
    assert_eq!(driver.analyte, "C6H6");
    assert_eq!(driver.adducts, vec![ArgAdduct::Builtin(BuiltinAdduct::PlusSodium)]);
    assert_eq!(driver.min_ions, 3);
    assert_eq!(driver.points, 5);
    assert_eq!(driver.time_range, Some(TimeRange::new(5.0, f64::INFINITY)));
    // Values left at their command line defaults do not mask the configuration
    assert_eq!(driver.min_width, 6);
    assert_eq!(driver.extraction_params().left_tolerance, 0.25);
    assert_eq!(driver.extraction_params().right_tolerance, 0.1);
    assert_eq!(driver.output_format, OutputFormat::Tsv);
}

#[test_log::test]
fn test_configure_without_config() {
    let matches = MZAdducter::command().get_matches_from(["mzadducter", "run.mzML", "-f", "C6H6"]);
    let driver = MZAdducter::configure(&matches, Figment::new()).unwrap();
    assert_eq!(
        driver,
        MZAdducter::parse_from(["mzadducter", "run.mzML", "-f", "C6H6"])
    );
}

#[test_log::test]
fn test_invalid_adduct_config() {
    let config = Figment::from(Toml::string(r#"adducts = ["[%s + K]⁺:K:mul"]"#));
    assert!(config.extract::<MZAdducter>().is_err());
}
