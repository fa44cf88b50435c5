//! Pipeline settings.

use std::fmt;
use std::str::FromStr;

use gmdc_core::{GmdcError, Result};

/// Which shape key data is exported as morphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MorphExport {
    #[default]
    None,
    Positions,
    PositionsAndNormals,
}

impl MorphExport {
    pub fn enabled(self) -> bool {
        self != MorphExport::None
    }

    pub fn with_normals(self) -> bool {
        self == MorphExport::PositionsAndNormals
    }
}

impl FromStr for MorphExport {
    type Err = GmdcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(MorphExport::None),
            "positions" => Ok(MorphExport::Positions),
            "normals" | "positions-and-normals" => Ok(MorphExport::PositionsAndNormals),
            other => Err(GmdcError::invalid_parameter(format!(
                "unknown morph export mode \"{}\"",
                other
            ))),
        }
    }
}

impl fmt::Display for MorphExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MorphExport::None => "none",
            MorphExport::Positions => "positions",
            MorphExport::PositionsAndNormals => "normals",
        };
        f.write_str(s)
    }
}

/// Settings of [`crate::pack()`].
///
/// ```
/// use gmdc_mesh::{ExportOptions, MorphExport};
///
/// let options = ExportOptions::new()
///     .with_rigging(true)
///     .with_morphs(MorphExport::Positions);
/// assert!(options.rigging());
/// assert!(!options.tangents());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    rigging: bool,
    tangents: bool,
    morphs: MorphExport,
    use_properties: bool,
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Export bone indices and weights. Needs a transform tree.
    pub fn rigging(&self) -> bool {
        self.rigging
    }

    pub fn set_rigging(&mut self, value: bool) {
        self.rigging = value;
    }

    pub fn with_rigging(mut self, value: bool) -> Self {
        self.set_rigging(value);
        self
    }

    pub fn tangents(&self) -> bool {
        self.tangents
    }

    pub fn set_tangents(&mut self, value: bool) {
        self.tangents = value;
    }

    pub fn with_tangents(mut self, value: bool) -> Self {
        self.set_tangents(value);
        self
    }

    pub fn morphs(&self) -> MorphExport {
        self.morphs
    }

    pub fn set_morphs(&mut self, value: MorphExport) {
        self.morphs = value;
    }

    pub fn with_morphs(mut self, value: MorphExport) -> Self {
        self.set_morphs(value);
        self
    }

    /// Honor the `name`, `flags` and `selected_only` mesh properties.
    pub fn use_properties(&self) -> bool {
        self.use_properties
    }

    pub fn set_use_properties(&mut self, value: bool) {
        self.use_properties = value;
    }

    pub fn with_use_properties(mut self, value: bool) -> Self {
        self.set_use_properties(value);
        self
    }
}

/// Settings of [`crate::unpack()`].
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    import_bounding_mesh: bool,
    remove_doubles: bool,
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn import_bounding_mesh(&self) -> bool {
        self.import_bounding_mesh
    }

    pub fn set_import_bounding_mesh(&mut self, value: bool) {
        self.import_bounding_mesh = value;
    }

    pub fn with_import_bounding_mesh(mut self, value: bool) -> Self {
        self.set_import_bounding_mesh(value);
        self
    }

    pub fn remove_doubles(&self) -> bool {
        self.remove_doubles
    }

    pub fn set_remove_doubles(&mut self, value: bool) {
        self.remove_doubles = value;
    }

    pub fn with_remove_doubles(mut self, value: bool) -> Self {
        self.set_remove_doubles(value);
        self
    }
}
