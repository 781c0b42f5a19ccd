use batchren_core::Preview;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PreviewArg {
    Table,
    Summary,
    Json,
    None,
}

impl PreviewArg {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(Self::Table),
            "summary" => Some(Self::Summary),
            "json" => Some(Self::Json),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    /// CLI choice first, then the configured default, then a table
    pub fn resolve(arg: Option<Self>, configured: &str) -> Preview {
        arg.or_else(|| Self::from_str(configured))
            .unwrap_or(Self::Table)
            .into()
    }
}

impl From<PreviewArg> for Preview {
    fn from(arg: PreviewArg) -> Self {
        match arg {
            PreviewArg::Table => Self::Table,
            PreviewArg::Summary => Self::Summary,
            PreviewArg::Json => Self::Json,
            PreviewArg::None => Self::None,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Summary,
    Json,
}

impl From<OutputFormat> for batchren_core::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Summary => Self::Summary,
            OutputFormat::Json => Self::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_preview() {
        assert_eq!(
            PreviewArg::resolve(Some(PreviewArg::Json), "summary"),
            Preview::Json
        );
        assert_eq!(PreviewArg::resolve(None, "Summary"), Preview::Summary);
        assert_eq!(PreviewArg::resolve(None, "diff"), Preview::Table);
    }
}
