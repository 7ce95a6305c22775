use crate::ast::Design;
use std::io::Read;
use std::path::Path;
use sv2rtl_utils::{Error, Sv2RtlResult};

impl Design {
    /// Construct a design from a file or the input stream.
    pub fn construct(file: Option<&Path>) -> Sv2RtlResult<Self> {
        match file {
            Some(file) => {
                let text = std::fs::read_to_string(file).map_err(|err| {
                    Error::invalid_file(format!(
                        "{}: {}",
                        file.to_string_lossy(),
                        err
                    ))
                })?;
                Self::construct_from_str(&text)
            }
            None => {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .map_err(|err| Error::invalid_file(err.to_string()))?;
                Self::construct_from_str(&text)
            }
        }
    }

    /// Construct a design from its JSON serialization.
    pub fn construct_from_str(inp: &str) -> Sv2RtlResult<Self> {
        let design: Design = serde_json::from_str(inp)?;
        log::debug!(
            "loaded {} package(s) and {} module(s)",
            design.packages.len(),
            design.modules.len()
        );
        Ok(design)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ProcessKind, Stmt};

    #[test]
    fn parses_minimal_design() {
        let d = Design::construct_from_str(
            r#"{
              "modules": [{
                "name": "m",
                "ports": [{ "name": "a", "direction": "input" }],
                "processes": [{
                  "kind": "always_comb",
                  "body": { "kind": "begin", "stmts": [{ "kind": "null" }] }
                }]
              }]
            }"#,
        )
        .unwrap();
        assert_eq!(d.modules.len(), 1);
        let m = &d.modules[0];
        assert_eq!(m.processes[0].kind, ProcessKind::AlwaysComb);
        assert!(matches!(m.processes[0].body, Stmt::Begin { .. }));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(Design::construct_from_str("{ \"modules\": 3 }").is_err());
    }
}
