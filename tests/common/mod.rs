//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use admissions_explorer::db::SqliteStore;

pub const COMMUNITIES: [&str; 3] = ["Andalucía", "Galicia", "Madrid"];
pub const CATEGORIES: [&str; 2] = ["Ansiedad", "Depresión"];
pub const ROWS: usize = 25;

const SCHEMA: &str = "
    CREATE TABLE COMUNIDADES (NOMBRE_COMUNIDAD TEXT NOT NULL);
    CREATE TABLE CATEGORIAS_DIAGNOSTICO (NOMBRE_CATEGORIA TEXT NOT NULL);
    CREATE TABLE INGRESOS (
        ID INTEGER PRIMARY KEY,
        COMUNIDAD_ATENCION TEXT,
        SEXO TEXT,
        CATEGORIA_DIAGNOSTICO TEXT,
        FECHA_INGRESO TEXT,
        MES_INGRESO INTEGER,
        ESTANCIA_DIAS TEXT,
        COSTE_APR REAL,
        DIAS_UCI INTEGER
    );
    CREATE VIEW VISTAMUYINTERESANTE AS SELECT * FROM INGRESOS;
";

/// Row `id` (1-based) of the standard dataset.
///
/// Even ids are `Mujer`; every fifth id spent `id / 5` days in the ICU;
/// months cycle 1..=12 through 2023.
pub fn admission_row(id: usize) -> String {
    let community = COMMUNITIES[id % COMMUNITIES.len()];
    let sex = if id % 2 == 0 { "Mujer" } else { "Hombre" };
    let category = CATEGORIES[(id / 2) % CATEGORIES.len()];
    let month = (id - 1) % 12 + 1;
    let icu_days = if id % 5 == 0 { id / 5 } else { 0 };
    format!(
        "({id}, '{community}', '{sex}', '{category}', '2023-{month:02}-10', {month}, '{id}', 1000.0, {icu_days})"
    )
}

/// Lookup tables, the admissions table and the view, with [`ROWS`] admissions
pub fn seed(store: &SqliteStore) {
    let mut sql = String::from(SCHEMA);
    for community in COMMUNITIES.iter().rev() {
        writeln!(sql, "INSERT INTO COMUNIDADES VALUES ('{community}');").unwrap();
    }
    for category in CATEGORIES.iter().rev() {
        writeln!(sql, "INSERT INTO CATEGORIAS_DIAGNOSTICO VALUES ('{category}');").unwrap();
    }
    let rows: Vec<String> = (1..=ROWS).map(admission_row).collect();
    writeln!(sql, "INSERT INTO INGRESOS VALUES {};", rows.join(",\n")).unwrap();
    store.execute_batch(&sql).unwrap();
}

/// Seeded private in-memory store
pub fn seeded_memory_store() -> SqliteStore {
    let store = SqliteStore::in_memory().unwrap();
    seed(&store);
    store
}

/// Seeded store backed by a file under `dir`
pub fn seeded_file_store(dir: &Path) -> SqliteStore {
    let path = dir.join("admissions.db");
    let store = SqliteStore::open(path.to_str().unwrap(), 4, Duration::from_secs(5)).unwrap();
    seed(&store);
    store
}

/// Store with only the schema and the given `(SEXO, ESTANCIA_DIAS)` rows
pub fn store_with_stays(rows: &[(&str, &str)]) -> SqliteStore {
    let store = SqliteStore::in_memory().unwrap();
    let mut sql = String::from(SCHEMA);
    for (index, (sex, stay)) in rows.iter().enumerate() {
        writeln!(
            sql,
            "INSERT INTO INGRESOS (ID, SEXO, ESTANCIA_DIAS) VALUES ({}, '{sex}', '{stay}');",
            index + 1
        )
        .unwrap();
    }
    store.execute_batch(&sql).unwrap();
    store
}
