use std::collections::HashSet;
use crate::{
    types::{ClassDef, ClassItem, Declaration, EnumDef},
    utils::quote,
    error::IdlError,
};

/// Returns `Ok(())` if every class and enum name is unique within its
/// enclosing scope and every enum has distinct enumerators.
pub fn verify_schema(declarations: &[Declaration]) -> Result<(), IdlError> {
    verify_declarations(declarations, "the file scope")
}

fn verify_declarations(declarations: &[Declaration], scope: &str) -> Result<(), IdlError> {
    let mut defined: HashSet<&str> = HashSet::new();

    for declaration in declarations {
        match declaration {
            Declaration::Class(cls) => {
                check_unique(&mut defined, &cls.name, scope)?;
                verify_class(cls)?;
            }
            Declaration::Enum(enum_def) => {
                check_unique(&mut defined, &enum_def.name, scope)?;
                verify_enum(enum_def)?;
            }
            // Reopening a namespace is allowed.
            Declaration::Namespace(namespace) => {
                verify_declarations(
                    &namespace.members,
                    &format!("namespace {}", quote(&namespace.name)),
                )?;
            }
        }
    }
    Ok(())
}

fn verify_class(cls: &ClassDef) -> Result<(), IdlError> {
    let scope = format!("class {}", quote(&cls.name));
    let mut defined: HashSet<&str> = HashSet::new();

    for item in &cls.members {
        match item {
            ClassItem::Class(nested) => {
                check_unique(&mut defined, &nested.name, &scope)?;
                verify_class(nested)?;
            }
            ClassItem::Enum(nested) => {
                check_unique(&mut defined, &nested.name, &scope)?;
                verify_enum(nested)?;
            }
            ClassItem::Member(_) => {}
        }
    }
    Ok(())
}

fn verify_enum(enum_def: &EnumDef) -> Result<(), IdlError> {
    let scope = format!("enum {}", quote(&enum_def.name));
    let mut defined: HashSet<&str> = HashSet::new();
    for value in &enum_def.members {
        check_unique(&mut defined, &value.name, &scope)?;
    }
    Ok(())
}

fn check_unique<'a>(
    defined: &mut HashSet<&'a str>,
    name: &'a str,
    scope: &str,
) -> Result<(), IdlError> {
    if !defined.insert(name) {
        return Err(IdlError::DuplicateDefinition {
            name:  quote(name),
            scope: scope.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::parse_schema, tokenizer::tokenize_schema};

    fn verify(text: &str) -> Result<(), IdlError> {
        verify_schema(&parse_schema(&tokenize_schema(text).unwrap(), text).unwrap())
    }

    #[test]
    fn test_same_name_in_different_scopes_is_fine() {
        verify("class a { class b {}; }; namespace n { class a {}; } class b {};").unwrap();
    }

    #[test]
    fn test_duplicate_top_level_class() {
        let err = verify("class a {}; enum class a : int { x };").unwrap_err();
        assert!(matches!(err, IdlError::DuplicateDefinition { .. }));
        assert_eq!(
            err.to_string(),
            "The name \"a\" is defined twice in the file scope"
        );
    }

    #[test]
    fn test_duplicate_nested_class() {
        let err = verify("namespace n { class a { class b {}; struct b {}; }; }").unwrap_err();
        assert_eq!(err.to_string(), "The name \"b\" is defined twice in class \"a\"");
    }

    #[test]
    fn test_duplicate_enumerator() {
        assert!(verify("enum class e : int { x, y, x };").is_err());
    }
}
