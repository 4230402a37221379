use clap::Parser;
use punchrun_cli::cli_args::Cli;
use punchrun_core::DayChoice;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("punchrun").chain(args.iter().copied())).unwrap()
}

#[test]
fn bare_invocation_produces_no_overrides() {
    let cli = parse(&[]);
    let (overrides, warnings) = cli.run.to_overrides().unwrap();
    assert!(overrides.is_empty());
    assert!(warnings.is_empty());
    assert!(!cli.save);
}

#[test]
fn mode_flags_map_to_with_time_override() {
    let (overrides, _) = parse(&["--with-time"]).run.to_overrides().unwrap();
    assert_eq!(overrides.with_time, Some(true));

    let (overrides, _) = parse(&["--simple"]).run.to_overrides().unwrap();
    assert_eq!(overrides.with_time, Some(false));

    let (overrides, _) = parse(&[]).run.to_overrides().unwrap();
    assert_eq!(overrides.with_time, None);
}

#[test]
fn mode_flags_conflict() {
    let result =
        Cli::try_parse_from(["punchrun", "--with-time", "--simple"]);
    assert!(result.is_err());
}

#[test]
fn day_choice_accepts_counts_and_all() {
    let (overrides, _) = parse(&["--days", "3"]).run.to_overrides().unwrap();
    assert_eq!(overrides.days.as_deref(), Some("3"));

    let (overrides, _) = parse(&["--days", "all"]).run.to_overrides().unwrap();
    assert_eq!(
        DayChoice::parse(overrides.days.as_deref().unwrap()).unwrap(),
        DayChoice::All
    );
}

#[test]
fn day_choice_rejects_zero_and_oversized_counts() {
    assert!(parse(&["--days", "0"]).run.to_overrides().is_err());
    assert!(parse(&["--days", "11"]).run.to_overrides().is_err());
    assert!(parse(&["--days", "10"]).run.to_overrides().is_ok());
    assert!(parse(&["--days", "soon"]).run.to_overrides().is_err());
}

#[test]
fn repeated_labels_collect_in_order() {
    let cli = parse(&["--label", "閱讀文獻", "--label", "實驗實做"]);
    let (overrides, _) = cli.run.to_overrides().unwrap();
    assert_eq!(
        overrides.content_labels,
        Some(vec!["閱讀文獻".to_string(), "實驗實做".to_string()])
    );
}

#[test]
fn url_overrides_pass_through() {
    let cli = parse(&[
        "--calendar-url",
        "http://localhost:8000/calendar/",
        "--webdriver-url",
        "http://127.0.0.1:9516",
        "--portal-url",
        "http://localhost:8000/punch",
    ]);
    let (overrides, _) = cli.run.to_overrides().unwrap();
    assert_eq!(
        overrides.calendar_url.as_deref(),
        Some("http://localhost:8000/calendar/")
    );
    assert_eq!(
        overrides.webdriver_url.as_deref(),
        Some("http://127.0.0.1:9516")
    );
    assert_eq!(
        overrides.portal_base_url.as_deref(),
        Some("http://localhost:8000/punch")
    );
}

#[test]
fn save_flag_and_user_parse() {
    let cli = parse(&["--save", "--user", "A123456789"]);
    assert!(cli.save);
    let (overrides, _) = cli.run.to_overrides().unwrap();
    assert_eq!(overrides.username.as_deref(), Some("A123456789"));
}

#[test]
fn time_field_overrides_parse() {
    let cli = parse(&["--begin", "0900", "--end", "1800", "--hours", "8"]);
    let (overrides, _) = cli.run.to_overrides().unwrap();
    assert_eq!(overrides.begin_time.as_deref(), Some("0900"));
    assert_eq!(overrides.end_time.as_deref(), Some("1800"));
    assert_eq!(overrides.hours.as_deref(), Some("8"));
}
