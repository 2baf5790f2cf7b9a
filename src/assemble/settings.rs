use crate::jvm::class_file::Version;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Add a line number entry for every instruction coming from a new source line
    ///
    /// Explicit `.line` directives are ignored when this is on.
    pub auto_line_numbers: bool,

    /// Class file version used unless there is a `.bytecode` directive
    pub default_version: Version,

    /// Name for the `SourceFile` attribute unless there is a `.source` directive
    pub source_file: Option<String>,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            auto_line_numbers: false,
            default_version: Version::JAVA1_1,
            source_file: None,
        }
    }
}
