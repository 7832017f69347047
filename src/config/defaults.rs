//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn input() -> PathBuf {
        "src/index.html".into()
    }

    pub fn pages() -> PathBuf {
        "pages".into()
    }

    pub fn output() -> PathBuf {
        "dist".into()
    }

    pub fn r#static() -> PathBuf {
        "static".into()
    }

    pub fn components() -> PathBuf {
        "components".into()
    }

    pub mod reload {
        pub fn src() -> String {
            "/__quilt/reload.js".into()
        }
    }
}
