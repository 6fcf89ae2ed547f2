//! Typed option sets of the `java`, `javac` and `javadoc` invocations

use crate::config::ConfigError;
use crate::options::{OptionValue, Options};
use crate::resolver::DependencySpec;
use std::path::PathBuf;

/// Options of a `java` invocation
#[derive(Debug, Clone, Default)]
pub struct JavaOptions {
    pub classpath: Vec<DependencySpec>,
    /// JVM arguments; `JAVA_OPTS` from the session when `None`
    pub java_args: Option<Vec<String>>,
    /// `-Dkey=value` system properties
    pub properties: Vec<(String, String)>,
    /// Human-readable name used in logs and failure messages
    pub name: Option<String>,
    /// Print the command line; follows the `java` trace category when `None`
    pub verbose: Option<bool>,
    pub dir: Option<PathBuf>,
    /// Force (`Some(true)`) or forbid (`Some(false)`) a pathing jar;
    /// `None` decides by the classpath length limit
    pub pathing_jar: Option<bool>,
}

impl JavaOptions {
    pub const KEYS: [&'static str; 7] = [
        "classpath",
        "java_args",
        "properties",
        "name",
        "verbose",
        "dir",
        "pathing_jar",
    ];

    pub fn from_options(options: &Options) -> Result<Self, ConfigError> {
        options.check("java", &Self::KEYS)?;
        Ok(Self {
            classpath: specs(options, "classpath"),
            java_args: options.get("java_args").map(OptionValue::to_strings),
            properties: options.get_map("properties"),
            name: options.get_str("name").map(str::to_string),
            verbose: options.get_bool("verbose"),
            dir: options.get_str("dir").map(PathBuf::from),
            pathing_jar: options.get_bool("pathing_jar"),
        })
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_classpath(mut self, classpath: Vec<DependencySpec>) -> Self {
        self.classpath = classpath;
        self
    }
}

/// Options of a `javac` invocation
#[derive(Debug, Clone, Default)]
pub struct JavacOptions {
    pub classpath: Vec<DependencySpec>,
    pub sourcepath: Vec<PathBuf>,
    /// `-d` directory, created before compiling
    pub output: Option<PathBuf>,
    pub javac_args: Vec<String>,
    pub name: Option<String>,
}

impl JavacOptions {
    pub const KEYS: [&'static str; 5] = ["classpath", "sourcepath", "output", "javac_args", "name"];

    pub fn from_options(options: &Options) -> Result<Self, ConfigError> {
        options.check("javac", &Self::KEYS)?;
        Ok(Self {
            classpath: specs(options, "classpath"),
            sourcepath: options.get_list("sourcepath").into_iter().map(PathBuf::from).collect(),
            output: options.get_str("output").map(PathBuf::from),
            javac_args: options.get_list("javac_args"),
            name: options.get_str("name").map(str::to_string),
        })
    }
}

/// Options of a `javadoc` invocation
///
/// Keys other than output, name, sourcepath and classpath become javadoc flags.
#[derive(Debug, Clone, Default)]
pub struct JavadocOptions {
    pub output: Option<PathBuf>,
    pub classpath: Vec<DependencySpec>,
    pub sourcepath: Vec<PathBuf>,
    pub name: Option<String>,
    pub flags: Options,
}

impl JavadocOptions {
    pub fn from_options(options: &Options) -> Self {
        let mut flags = options.clone();
        let output = flags.remove("output").and_then(|v| v.as_str().map(PathBuf::from));
        let name = flags.remove("name").and_then(|v| v.as_str().map(str::to_string));
        let sourcepath = flags
            .remove("sourcepath")
            .map(|v| v.to_strings().into_iter().map(PathBuf::from).collect())
            .unwrap_or_default();
        let classpath = flags
            .remove("classpath")
            .map(|v| v.to_strings().iter().map(|s| DependencySpec::parse(s)).collect())
            .unwrap_or_default();
        Self {
            output,
            classpath,
            sourcepath,
            name,
            flags,
        }
    }

    /// `true` → `-key`, `false` → `-nokey`, maps → `-key k v` per entry,
    /// lists → `-key item` per item, scalars → `-key value`
    pub fn flag_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for (key, value) in self.flags.iter() {
            match value {
                OptionValue::Bool(true) => args.push(format!("-{}", key)),
                OptionValue::Bool(false) => args.push(format!("-no{}", key)),
                OptionValue::Map(map) => {
                    for (k, v) in map {
                        args.push(format!("-{}", key));
                        args.push(k.clone());
                        args.push(v.render());
                    }
                }
                OptionValue::List(items) => {
                    for item in items {
                        args.push(format!("-{}", key));
                        args.push(item.render());
                    }
                }
                scalar => {
                    args.push(format!("-{}", key));
                    args.push(scalar.render());
                }
            }
        }
        args
    }
}

fn specs(options: &Options, key: &str) -> Vec<DependencySpec> {
    options
        .get_list(key)
        .iter()
        .map(|s| DependencySpec::parse(s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_java_options_from_bag() {
        let props: OptionValue = vec![("env", "test")].into_iter().collect();
        let options = Options::new()
            .with("classpath", vec!["lib/a.jar", "group:id:jar:1.0"])
            .with("properties", props)
            .with("name", "TestNG in foo")
            .with("pathing_jar", true);
        let java = JavaOptions::from_options(&options).unwrap();
        assert_eq!(java.classpath.len(), 2);
        assert!(matches!(java.classpath[1], DependencySpec::Artifact(_)));
        assert_eq!(java.properties, vec![("env".to_string(), "test".to_string())]);
        assert_eq!(java.name.as_deref(), Some("TestNG in foo"));
        assert_eq!(java.pathing_jar, Some(true));
        assert!(java.java_args.is_none());
    }

    #[test]
    fn test_java_options_reject_unknown_key() {
        let options = Options::new().with("classpth", "a.jar");
        assert!(matches!(
            JavaOptions::from_options(&options),
            Err(ConfigError::UnknownOption { .. })
        ));
    }

    #[test]
    fn test_javac_options_reject_unknown_key() {
        let options = Options::new().with("output", "out").with("fork", true);
        assert!(JavacOptions::from_options(&options).is_err());
    }

    #[test]
    fn test_javadoc_flag_translation() {
        let links: OptionValue = vec![("http://a", "pkg")].into_iter().collect();
        let options = Options::new()
            .with("output", "target/doc")
            .with("author", true)
            .with("timestamp", false)
            .with("windowtitle", "My API")
            .with("link", vec!["http://x", "http://y"])
            .with("linkoffline", links);
        let javadoc = JavadocOptions::from_options(&options);
        assert_eq!(javadoc.output, Some(PathBuf::from("target/doc")));
        assert_eq!(
            javadoc.flag_args(),
            vec![
                "-author",
                "-notimestamp",
                "-windowtitle",
                "My API",
                "-link",
                "http://x",
                "-link",
                "http://y",
                "-linkoffline",
                "http://a",
                "pkg",
            ]
        );
    }
}
