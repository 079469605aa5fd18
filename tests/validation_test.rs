//! Unit tests for validation.rs module

use admissions_explorer::config::PaginationConfig;
use admissions_explorer::error::ExplorerError;
use admissions_explorer::models::PageRequest;
use admissions_explorer::validation::{InputValidator, RawQueryParams};
use chrono::NaiveDate;

const LIMITS: PaginationConfig = PaginationConfig {
    default_per_page: 10,
    max_per_page: 100,
};

fn params(pairs: &[(&str, &str)]) -> RawQueryParams {
    let mut raw = RawQueryParams::default();
    for (key, value) in pairs {
        let value = Some((*value).to_string());
        match *key {
            "comunidad" => raw.comunidad = value,
            "sexo" => raw.sexo = value,
            "categoria" => raw.categoria = value,
            "fecha_inicio" => raw.fecha_inicio = value,
            "fecha_fin" => raw.fecha_fin = value,
            "page" => raw.page = value,
            "per_page" => raw.per_page = value,
            other => panic!("unknown parameter {other}"),
        }
    }
    raw
}

#[test]
fn test_all_filters_present() {
    let filters = params(&[
        ("comunidad", "Madrid"),
        ("sexo", "Mujer"),
        ("categoria", "Depresión"),
        ("fecha_inicio", "2023-01-01"),
        ("fecha_fin", "2023-12-31"),
    ])
    .filters()
    .unwrap();

    assert_eq!(filters.community.as_deref(), Some("Madrid"));
    assert_eq!(filters.sex.as_deref(), Some("Mujer"));
    assert_eq!(filters.category.as_deref(), Some("Depresión"));
    assert_eq!(filters.date_from, NaiveDate::from_ymd_opt(2023, 1, 1));
    assert_eq!(filters.date_to, NaiveDate::from_ymd_opt(2023, 12, 31));
    assert_eq!(filters.present_count(), 5);
}

#[test]
fn test_empty_strings_are_absent() {
    let filters = params(&[("comunidad", ""), ("fecha_inicio", ""), ("fecha_fin", "  ")])
        .filters()
        .unwrap();
    assert!(filters.is_empty());
}

#[test]
fn test_malformed_dates_are_rejected() {
    for date in ["2023-13-01", "01/02/2023", "2023-02-30", "ayer"] {
        let result = params(&[("fecha_inicio", date)]).filters();
        assert!(matches!(result, Err(ExplorerError::Validation(_))), "accepted {date}");
    }
}

#[test]
fn test_reversed_date_range_is_accepted() {
    let filters = params(&[("fecha_inicio", "2023-12-31"), ("fecha_fin", "2023-01-01")])
        .filters()
        .unwrap();
    assert!(filters.date_from > filters.date_to);
}

#[test]
fn test_page_defaults() {
    let page = RawQueryParams::default().page(&LIMITS).unwrap();
    assert_eq!(page.page(), PageRequest::DEFAULT_PAGE);
    assert_eq!(page.per_page(), LIMITS.default_per_page);
}

#[test]
fn test_page_values_parsed() {
    let page = params(&[("page", "3"), ("per_page", "25")]).page(&LIMITS).unwrap();
    assert_eq!(page.page(), 3);
    assert_eq!(page.per_page(), 25);
    assert_eq!(page.offset(), 50);
}

#[test]
fn test_invalid_page_values() {
    for (key, value) in [
        ("page", "0"),
        ("page", "-1"),
        ("page", "dos"),
        ("per_page", "0"),
        ("per_page", "1.5"),
        ("per_page", "101"),
    ] {
        let result = params(&[(key, value)]).page(&LIMITS);
        assert!(matches!(result, Err(ExplorerError::Validation(_))), "accepted {key}={value}");
    }
}

#[test]
fn test_per_page_at_maximum() {
    assert!(params(&[("per_page", "100")]).page(&LIMITS).is_ok());
}

#[test]
fn test_validate_question() {
    assert_eq!(
        InputValidator::validate_question("  ¿Cuántos ingresos hay?  ").unwrap(),
        "¿Cuántos ingresos hay?"
    );
    assert!(InputValidator::validate_question("").is_err());
    assert!(InputValidator::validate_question(" \t\n ").is_err());
    assert!(InputValidator::validate_question(&"a".repeat(InputValidator::MAX_QUESTION_CHARS + 1)).is_err());
}

#[test]
fn test_sanitize_text_removes_control_characters() {
    assert_eq!(InputValidator::sanitize_text("hola\0 mundo\u{7}"), "hola mundo");
    assert_eq!(InputValidator::sanitize_text("línea\nsiguiente"), "línea\nsiguiente");
}
