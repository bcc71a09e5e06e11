use crate::models::{FormatVersion, TemperatureWidth};

/// Generate a dataset filename with format: cdata_{tag}_{N}bit_{version}.cce
///
/// The tag names the upstream pipeline variant, e.g. "clean" or "interp".
pub fn dataset_filename(tag: &str, width: TemperatureWidth, version: FormatVersion) -> String {
    format!(
        "cdata_{}_{}bit_{}.cce",
        tag,
        width.bytes(),
        version.as_u8()
    )
}
