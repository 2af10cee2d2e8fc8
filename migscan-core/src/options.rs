//! Write configuration: archive compression and document properties.

/// Compression level for saving workbooks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    /// Stored, no compression.
    None,
    /// Deflate level 1.
    Fast,
    /// Deflate level 6.
    #[default]
    Default,
    /// Deflate level 9.
    Best,
}

/// Values written to `docProps/core.xml` and `docProps/app.xml`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentProperties {
    pub title: String,
    /// Used for both `dc:creator` and `cp:lastModifiedBy`.
    pub creator: String,
    pub application: String,
    pub app_version: String,
}

impl Default for DocumentProperties {
    fn default() -> Self {
        DocumentProperties {
            title: "Data Migration Quality Report".to_string(),
            creator: "DataMigrationScanner".to_string(),
            application: "DataMigrationScanner".to_string(),
            app_version: "1.0".to_string(),
        }
    }
}

/// Everything that controls how a package is written, apart from its cells.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub compression: CompressionLevel,
    pub properties: DocumentProperties,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compression(mut self, level: CompressionLevel) -> Self {
        self.compression = level;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.properties.title = title.into();
        self
    }

    pub fn creator(mut self, creator: impl Into<String>) -> Self {
        self.properties.creator = creator.into();
        self
    }

    pub fn application(mut self, application: impl Into<String>, version: impl Into<String>) -> Self {
        self.properties.application = application.into();
        self.properties.app_version = version.into();
        self
    }

    /// ZIP entry options for the configured compression level.
    pub(crate) fn file_options(&self) -> zip::write::FileOptions<'static, zip::write::ExtendedFileOptions> {
        use zip::write::FileOptions;
        use zip::CompressionMethod;

        match self.compression {
            CompressionLevel::None => FileOptions::default()
                .large_file(false)
                .compression_method(CompressionMethod::Stored),
            CompressionLevel::Fast => FileOptions::default()
                .large_file(false)
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(1)),
            CompressionLevel::Default => FileOptions::default()
                .large_file(false)
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(6)),
            CompressionLevel::Best => FileOptions::default()
                .large_file(false)
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(9)),
        }
    }
}
