use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicType {
    pub name:     String,
    pub is_const: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateType {
    pub name:                String,
    pub template_parameters: Vec<Type>,
}

/// A type reference as written in a field declaration or template argument.
/// Numeric template arguments are stored as `Basic` with the number as name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Type {
    Basic(BasicType),
    Template(TemplateType),
}

impl Type {
    pub fn basic(name: &str) -> Type {
        Type::Basic(BasicType {
            name:     name.to_string(),
            is_const: false,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Type::Basic(b)    => &b.name,
            Type::Template(t) => &t.name,
        }
    }

    /// The C++ spelling of the type, e.g. `const foo` or `std::vector<int>`.
    pub fn param_type(&self) -> String {
        match self {
            Type::Basic(b) if b.is_const => format!("const {}", b.name),
            Type::Basic(b)               => b.name.clone(),
            Type::Template(t) => format!(
                "{}<{}>",
                t.name,
                t.template_parameters
                    .iter()
                    .map(Type::param_type)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    /// Identifier-safe spelling used in generated struct names,
    /// e.g. `std__optional__int` for `std::optional<int>`.
    pub fn flat_type(&self) -> String {
        match self {
            Type::Basic(b) => b.name.replace("::", "__"),
            Type::Template(t) => format!(
                "{}__{}",
                t.name,
                t.template_parameters
                    .iter()
                    .map(Type::flat_type)
                    .collect::<Vec<_>>()
                    .join("_")
            )
            .replace("::", "__"),
        }
    }

    /// Every leaf type name mentioned by this type. Template heads are not
    /// leaves; duplicates are kept.
    pub fn list_types(&self) -> Vec<&str> {
        match self {
            Type::Basic(b) => vec![b.name.as_str()],
            Type::Template(t) => t
                .template_parameters
                .iter()
                .flat_map(Type::list_types)
                .collect(),
        }
    }

    pub fn template_parameters(&self) -> &[Type] {
        match self {
            Type::Basic(_)    => &[],
            Type::Template(t) => &t.template_parameters,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumValue {
    pub name:        String,
    pub initializer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumDef {
    pub name:            String,
    pub line:            usize,
    pub column:          usize,
    pub underlying_type: String,
    pub members:         Vec<EnumValue>,

    // Filled in by the metadata annotator.
    pub namespace_path:         Vec<String>,
    pub parent_template_params: Vec<ClassTemplateParam>,
}

impl EnumDef {
    pub fn qualified_name(&self) -> String {
        qualify(&self.namespace_path, &self.name)
    }

    pub fn template_declaration(&self) -> String {
        template_declaration(&self.parent_template_params)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MemberKind {
    /// `T name;`
    Data,
    /// `T name();`, an accessor of a private field.
    Function,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMember {
    pub kind:          MemberKind,
    pub type_:         Type,
    pub name:          String,
    pub line:          usize,
    pub column:        usize,
    pub attribute:     Option<Attribute>,
    pub default_value: Option<String>,
}

impl ClassMember {
    /// Expression reading the member off an object, `name` or `name()`.
    pub fn access_expr(&self) -> String {
        match self.kind {
            MemberKind::Data     => self.name.clone(),
            MemberKind::Function => format!("{}()", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassTemplateParam {
    pub typename: String,
    pub name:     String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum ClassItem {
    Member(ClassMember),
    Class(ClassDef),
    Enum(EnumDef),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassDef {
    pub name:            String,
    pub line:            usize,
    pub column:          usize,
    pub members:         Vec<ClassItem>,
    pub is_final:        bool,
    pub is_stub:         bool,
    pub attribute:       Option<Attribute>,
    pub template_params: Option<Vec<ClassTemplateParam>>,

    // Filled in by the metadata annotator.
    pub namespace_path:         Vec<String>,
    pub parent_template_params: Vec<ClassTemplateParam>,
}

impl ClassDef {
    /// Data and accessor members in declaration order, nested types skipped.
    pub fn fields(&self) -> impl Iterator<Item = &ClassMember> {
        self.members.iter().filter_map(|item| match item {
            ClassItem::Member(member) => Some(member),
            ClassItem::Class(_) | ClassItem::Enum(_) => None,
        })
    }

    pub fn is_writable(&self) -> bool {
        self.attribute
            .as_ref()
            .is_some_and(|attribute| attribute.name == "writable")
    }

    pub fn own_template_params(&self) -> &[ClassTemplateParam] {
        self.template_params.as_deref().unwrap_or(&[])
    }

    /// `<T,U>` for a class template, empty otherwise.
    pub fn template_args(&self) -> String {
        match &self.template_params {
            Some(params) => format!(
                "<{}>",
                params.iter().map(|p| p.name.as_str()).collect::<Vec<_>>().join(",")
            ),
            None => String::new(),
        }
    }

    /// Own parameters first, then the ones inherited from enclosing classes.
    pub fn all_template_params(&self) -> Vec<ClassTemplateParam> {
        self.own_template_params()
            .iter()
            .chain(self.parent_template_params.iter())
            .cloned()
            .collect()
    }

    pub fn template_declaration(&self) -> String {
        template_declaration(&self.all_template_params())
    }

    pub fn qualified_name(&self) -> String {
        qualify(&self.namespace_path, &self.name)
    }

    /// Qualified name including template arguments, e.g. `ns::tagged<T>`.
    pub fn full_name(&self) -> String {
        format!("{}{}", self.qualified_name(), self.template_args())
    }

    /// Scope name nested declarations see this class under.
    pub fn scope_name(&self) -> String {
        format!("{}{}", self.name, self.template_args())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespaceDef {
    pub name:    String,
    pub members: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Declaration {
    Class(ClassDef),
    Enum(EnumDef),
    Namespace(NamespaceDef),
}

/// `typename T, typename U`
pub fn template_params_str(params: &[ClassTemplateParam]) -> String {
    params
        .iter()
        .map(|p| format!("{} {}", p.typename, p.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn template_declaration(params: &[ClassTemplateParam]) -> String {
    if params.is_empty() {
        String::new()
    } else {
        format!("template <{}>", template_params_str(params))
    }
}

fn qualify(namespace_path: &[String], name: &str) -> String {
    if namespace_path.is_empty() {
        name.to_string()
    } else {
        format!("{}::{}", namespace_path.join("::"), name)
    }
}
