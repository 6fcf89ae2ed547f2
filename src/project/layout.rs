use std::fmt;
use std::path::PathBuf;

/// Main code or test code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Usage {
    Main,
    Test,
}

impl Usage {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Conventional directory layout, relative to a project's base directory
///
/// ```text
/// src/main/<language>       src/test/<language>
/// src/main/resources        src/test/resources
/// src/main/webapp           src/main/axis2
/// target/<engine target>    target/test/<engine target>
/// target/resources          target/test/resources
/// target/doc                target/generated/processors/<main|test>/java
/// reports/<framework>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub source: PathBuf,
    pub target: PathBuf,
    pub reports: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            source: PathBuf::from("src"),
            target: PathBuf::from("target"),
            reports: PathBuf::from("reports"),
        }
    }
}

impl Layout {
    pub fn source_dir(&self, usage: Usage, language: &str) -> PathBuf {
        self.source.join(usage.dir_name()).join(language)
    }

    pub fn resources_dir(&self, usage: Usage) -> PathBuf {
        self.source_dir(usage, "resources")
    }

    pub fn webapp_dir(&self) -> PathBuf {
        self.source_dir(Usage::Main, "webapp")
    }

    pub fn axis2_dir(&self) -> PathBuf {
        self.source_dir(Usage::Main, "axis2")
    }

    /// `target/<name>` for main code, `target/test/<name>` for tests
    pub fn target_dir(&self, usage: Usage, name: &str) -> PathBuf {
        match usage {
            Usage::Main => self.target.join(name),
            Usage::Test => self.target.join("test").join(name),
        }
    }

    pub fn resources_target(&self, usage: Usage) -> PathBuf {
        self.target_dir(usage, "resources")
    }

    pub fn doc_dir(&self) -> PathBuf {
        self.target.join("doc")
    }

    pub fn processors_dir(&self, usage: Usage) -> PathBuf {
        self.target
            .join("generated")
            .join("processors")
            .join(usage.dir_name())
            .join("java")
    }

    pub fn reports_dir(&self, name: &str) -> PathBuf {
        self.reports.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conventional_paths() {
        let layout = Layout::default();
        assert_eq!(layout.source_dir(Usage::Test, "java"), PathBuf::from("src/test/java"));
        assert_eq!(layout.target_dir(Usage::Main, "classes"), PathBuf::from("target/classes"));
        assert_eq!(
            layout.target_dir(Usage::Test, "classes"),
            PathBuf::from("target/test/classes")
        );
        assert_eq!(
            layout.processors_dir(Usage::Main),
            PathBuf::from("target/generated/processors/main/java")
        );
        assert_eq!(layout.reports_dir("testng"), PathBuf::from("reports/testng"));
    }
}
