// qualis-core/src/infrastructure/config/rules.rs

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use validator::Validate;
use walkdir::WalkDir;

use crate::domain::error::DomainError;
use crate::domain::quality::{Check, Comparison, Rule, RuleRegistry};
use crate::error::QualisError;
use crate::infrastructure::compiler::compile_predicate_lenient;
use crate::infrastructure::config::project::ProjectConfig;
use crate::infrastructure::error::InfrastructureError;

// =============================================================================
//  1. RULE FILE CONTRACT
// =============================================================================

/// `column: x` or `columns: [x, y]`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ColumnSet {
    One(String),
    Many(Vec<String>),
}

impl ColumnSet {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            ColumnSet::One(c) => vec![c.clone()],
            ColumnSet::Many(cs) => cs.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CheckDefinition {
    Completeness {
        #[serde(alias = "column")]
        columns: ColumnSet,
    },
    NullCheck {
        #[serde(alias = "column")]
        columns: ColumnSet,
    },
    DuplicateCheck {
        #[serde(alias = "key", alias = "column")]
        columns: ColumnSet,
    },
    WhitespaceCheck {
        column: String,
    },
    CrossField {
        left: String,
        op: Comparison,
        right: String,
    },
    BusinessPredicate {
        expression: String,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Validate)]
pub struct RuleDefinition {
    #[validate(length(min = 1, message = "Rule name cannot be empty"))]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub check: CheckDefinition,
}

impl RuleDefinition {
    /// Resolves the definition into a domain rule. Business-predicate
    /// expressions that fail to compile still produce a rule, which then
    /// reports an error when evaluated.
    pub fn to_rule(&self) -> Result<Rule, DomainError> {
        let check = match &self.check {
            CheckDefinition::Completeness { columns } => Check::Completeness {
                columns: columns.to_vec(),
            },
            CheckDefinition::NullCheck { columns } => Check::NullCheck {
                columns: columns.to_vec(),
            },
            CheckDefinition::DuplicateCheck { columns } => Check::DuplicateCheck {
                key: columns.to_vec(),
            },
            CheckDefinition::WhitespaceCheck { column } => Check::WhitespaceCheck {
                column: column.clone(),
            },
            CheckDefinition::CrossField { left, op, right } => Check::CrossField {
                left: left.clone(),
                op: *op,
                right: right.clone(),
            },
            CheckDefinition::BusinessPredicate { expression } => Check::BusinessPredicate {
                predicate: compile_predicate_lenient(expression),
            },
        };

        let rule = Rule::new(self.name.clone(), check)?;
        Ok(match &self.description {
            Some(d) => rule.with_description(d.clone()),
            None => rule,
        })
    }
}

#[derive(Debug, Deserialize, Default)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<RuleDefinition>,
}

// =============================================================================
//  2. LOADING
// =============================================================================

pub fn parse_rules(content: &str, origin: &str) -> Result<Vec<RuleDefinition>, InfrastructureError> {
    let file: RuleFile =
        serde_yaml::from_str(content).map_err(|source| InfrastructureError::YamlError {
            path: origin.to_string(),
            source,
        })?;
    Ok(file.rules)
}

pub fn load_rule_file(path: &Path) -> Result<Vec<RuleDefinition>, InfrastructureError> {
    let content = fs::read_to_string(path)?;
    parse_rules(&content, &path.display().to_string())
}

/// Every `*.yml` / `*.yaml` under the rule directories, sorted by path so the
/// registry order does not depend on directory listing order.
pub fn discover_rule_files(
    project_dir: &Path,
    rule_paths: &[String],
) -> Result<Vec<PathBuf>, InfrastructureError> {
    let mut files = Vec::new();

    for rule_path in rule_paths {
        let root = project_dir.join(rule_path);
        if !root.exists() {
            return Err(InfrastructureError::ConfigError(format!(
                "rule path '{}' does not exist",
                root.display()
            )));
        }

        for entry in WalkDir::new(&root).follow_links(true) {
            let entry = entry.map_err(|e| InfrastructureError::Io(e.into()))?;
            let is_yaml = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == "yml" || ext == "yaml");
            if entry.file_type().is_file() && is_yaml {
                files.push(entry.into_path());
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Builds the registry: inline rules first, then rule files in path order.
#[instrument(skip(config), fields(project = %config.name))]
pub fn build_registry(
    project_dir: &Path,
    config: &ProjectConfig,
) -> Result<RuleRegistry, QualisError> {
    let mut definitions = config.rules.clone();

    for path in discover_rule_files(project_dir, &config.rule_paths)? {
        let loaded = load_rule_file(&path)?;
        debug!(path = %path.display(), rules = loaded.len(), "rule file loaded");
        definitions.extend(loaded);
    }

    let mut registry = RuleRegistry::new();
    for definition in &definitions {
        definition
            .validate()
            .map_err(InfrastructureError::Validation)?;
        registry.register(definition.to_rule()?)?;
    }

    info!(rules = registry.len(), "rule registry built");
    Ok(registry)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::quality::{Predicate, RuleKind};
    use anyhow::Result;
    use tempfile::tempdir;

    const RULES: &str = r#"
rules:
  - name: order_id_complete
    kind: completeness
    column: order_id
  - name: keys_present
    kind: null-check
    columns: [order_id, customer_id]
  - name: order_id_unique
    kind: duplicate-check
    key: [order_id, line_no]
  - name: customer_name_trimmed
    kind: whitespace-check
    column: customer_name
  - name: ship_after_order
    kind: cross-field
    left: ship_date
    op: "<"
    right: order_date
  - name: positive_quantity
    kind: business-predicate
    description: Quantity must be at least one
    expression: "quantity < 1"
"#;

    #[test]
    fn test_parse_every_kind() -> Result<()> {
        let defs = parse_rules(RULES, "inline")?;
        let kinds: Vec<RuleKind> = defs
            .iter()
            .map(|d| d.to_rule().map(|r| r.kind()))
            .collect::<Result<_, _>>()?;
        assert_eq!(
            kinds,
            vec![
                RuleKind::Completeness,
                RuleKind::NullCheck,
                RuleKind::DuplicateCheck,
                RuleKind::WhitespaceCheck,
                RuleKind::CrossField,
                RuleKind::BusinessPredicate,
            ]
        );
        assert_eq!(
            defs[2].check,
            CheckDefinition::DuplicateCheck {
                columns: ColumnSet::Many(vec!["order_id".into(), "line_no".into()])
            }
        );
        assert_eq!(defs[5].description.as_deref(), Some("Quantity must be at least one"));
        Ok(())
    }

    #[test]
    fn test_unknown_kind_is_a_yaml_error() {
        let err = parse_rules("rules:\n  - name: x\n    kind: magic\n", "bad.yml").unwrap_err();
        assert!(matches!(err, InfrastructureError::YamlError { .. }));
    }

    #[test]
    fn test_malformed_expression_still_builds_rule() -> Result<()> {
        let defs = parse_rules(
            "rules:\n  - name: broken\n    kind: business-predicate\n    expression: 'quantity <'\n",
            "inline",
        )?;
        let rule = defs[0].to_rule()?;
        assert!(matches!(
            rule.check(),
            Check::BusinessPredicate {
                predicate: Predicate::Malformed { .. }
            }
        ));
        Ok(())
    }

    #[test]
    fn test_discover_rule_files_sorted() -> Result<()> {
        let dir = tempdir()?;
        let rules = dir.path().join("rules");
        fs::create_dir_all(rules.join("nested"))?;
        fs::write(rules.join("b.yml"), "rules: []")?;
        fs::write(rules.join("a.yaml"), "rules: []")?;
        fs::write(rules.join("nested").join("c.yml"), "rules: []")?;
        fs::write(rules.join("notes.txt"), "ignored")?;

        let files = discover_rule_files(dir.path(), &["rules".to_string()])?;

        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(&rules).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["a.yaml", "b.yml", "nested/c.yml"]);
        Ok(())
    }

    #[test]
    fn test_missing_rule_path_is_config_error() {
        let dir = tempdir().unwrap();
        let err = discover_rule_files(dir.path(), &["nowhere".to_string()]).unwrap_err();
        assert!(matches!(err, InfrastructureError::ConfigError(_)));
    }
}
