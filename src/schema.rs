//! Database schema definitions
//!
//! Table, view and column names of the admissions dataset. Names are upper
//! case because the production backend folds unquoted identifiers that way;
//! the SQLite store compares them case-insensitively.

/// Denormalized admissions view joining every lookup table
pub mod admissions {
    /// View name
    pub const VIEW: &str = "VISTAMUYINTERESANTE";
    /// Community of care
    pub const COMMUNITY: &str = "COMUNIDAD_ATENCION";
    /// Patient sex
    pub const SEX: &str = "SEXO";
    /// Diagnosis category
    pub const CATEGORY: &str = "CATEGORIA_DIAGNOSTICO";
    /// Admission date
    pub const ADMISSION_DATE: &str = "FECHA_INGRESO";
    /// Admission month bucket
    pub const ADMISSION_MONTH: &str = "MES_INGRESO";
    /// Length of stay in days (numeric as text)
    pub const LENGTH_OF_STAY: &str = "ESTANCIA_DIAS";
    /// APR cost (numeric as text)
    pub const APR_COST: &str = "COSTE_APR";
    /// Days spent in the ICU (numeric as text)
    pub const ICU_DAYS: &str = "DIAS_UCI";
}

/// Communities lookup table
pub mod communities {
    /// Table name
    pub const TABLE: &str = "COMUNIDADES";
    /// Community name column
    pub const NAME: &str = "NOMBRE_COMUNIDAD";
}

/// Diagnosis categories lookup table
pub mod categories {
    /// Table name
    pub const TABLE: &str = "CATEGORIAS_DIAGNOSTICO";
    /// Category name column
    pub const NAME: &str = "NOMBRE_CATEGORIA";
}

/// Normalized admissions table
pub mod admissions_table {
    /// Table name
    pub const TABLE: &str = "INGRESOS";
    /// Sex column
    pub const SEX: &str = "SEXO";
}

/// Helper column added by the windowed pager
pub const ROW_NUMBER_COLUMN: &str = "RNUM";
