//! TypeScript source rendering.
//!
//! Module file layout:
//!
//! ```text
//! import Money from '../money/Money.type';
//!
//! interface Order {
//!   total: Money;
//! }
//!
//! export default Order;
//! ```
//!
//! Namespace file layout:
//!
//! ```text
//! declare namespace Api {
//!   namespace __ImportedModules {
//!     type Money = import('./money/Money.type').default;
//!   }
//!
//!   interface Order {
//!     total: __ImportedModules.Money;
//!   }
//! }
//! ```

use std::path::Path;

use crate::config::Config;
use crate::imports::{ImportMapping, ImportPaths, module_import_lines, namespace_import_lines};
use crate::naming::{camel_case, is_identifier, quoted};
use crate::ts::{
    DocComment, EnumDefinition, IMPORTED_MODULES_NAMESPACE, InterfaceDefinition, RenderContext,
    TsTypeDefinition,
};

/// Render a namespace file holding `definitions`, in the given order.
pub fn render_namespace_file(
    namespace: &str,
    definitions: &[TsTypeDefinition],
    file: &Path,
    config: &Config,
) -> String {
    let mut imports = ImportMapping::default();
    for definition in definitions {
        imports.assign(definition);
    }
    let ctx = RenderContext::new(true, &imports);

    let mut lines = vec![format!("declare namespace {namespace} {{")];

    let import_lines = namespace_import_lines(&imports, file, &ImportPaths::from_config(config));
    if !import_lines.is_empty() {
        lines.push(format!("  namespace {IMPORTED_MODULES_NAMESPACE} {{"));
        lines.extend(import_lines.into_iter().map(|l| format!("    {l}")));
        lines.push("  }".to_string());
        lines.push(String::new());
    }

    for (i, definition) in definitions.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        render_definition(definition, &ctx, config, "  ", &mut lines);
    }

    lines.push("}".to_string());
    join_lines(&lines, config)
}

/// Render a module file holding one definition.
pub fn render_module_file(definition: &TsTypeDefinition, file: &Path, config: &Config) -> String {
    let mut imports = ImportMapping::for_module(file, definition.name());
    imports.assign(definition);
    let ctx = RenderContext::new(false, &imports);

    let mut lines = module_import_lines(&imports, file, &ImportPaths::from_config(config));
    if !lines.is_empty() {
        lines.push(String::new());
    }

    render_definition(definition, &ctx, config, "", &mut lines);

    match definition {
        TsTypeDefinition::Interface(def) => {
            if let Some(union) = def.derived_union.as_ref().filter(|u| !u.members.is_empty()) {
                lines.push(String::new());
                lines.push(format!("export type {{ {} }};", union.name));
            }
            lines.push(String::new());
            lines.push(format!("export default {};", def.name));

            for target in &def.must_be_subset_of {
                let target = target.render(&ctx);
                lines.push(String::new());
                lines.push(format!(
                    "// {} must be structurally assignable to {target}; \
                     a compile error on the next line means it is not.",
                    def.name
                ));
                lines.push(format!(
                    "(function() {{ const v: {} = {{}} as {target}; return v; }});",
                    def.name
                ));
            }
        }
        TsTypeDefinition::Enum(def) => {
            lines.push(String::new());
            lines.push(format!("export default {};", def.name));
        }
    }

    join_lines(&lines, config)
}

/// Render one declaration at `indent`.
pub fn render_definition(
    definition: &TsTypeDefinition,
    ctx: &RenderContext<'_>,
    config: &Config,
    indent: &str,
    out: &mut Vec<String>,
) {
    match definition {
        TsTypeDefinition::Interface(def) => render_interface(def, ctx, config, indent, out),
        TsTypeDefinition::Enum(def) => render_enum(def, config, indent, out),
    }
}

fn render_interface(
    def: &InterfaceDefinition,
    ctx: &RenderContext<'_>,
    config: &Config,
    indent: &str,
    out: &mut Vec<String>,
) {
    if let Some(doc) = &def.doc {
        render_doc(doc, indent, out);
    }

    let mut header = format!("{indent}interface {}", def.name);
    if !def.type_params.is_empty() {
        header.push_str(&format!("<{}>", def.type_params.join(", ")));
    }
    if !def.extends.is_empty() {
        let extends: Vec<String> = def.extends.iter().map(|e| e.render(ctx)).collect();
        header.push_str(&format!(" extends {}", extends.join(", ")));
    }
    header.push_str(" {");
    out.push(header);

    if let Some(member) = &def.discriminant {
        out.push(format!("{indent}  {member}: '{}';", def.name));
    }

    let member_indent = format!("{indent}  ");
    for member in &def.members {
        if let Some(doc) = &member.doc {
            render_doc(doc, &member_indent, out);
        }

        let nullable = member.ty.is_optional();
        let marker = if member.is_optional || (nullable && config.use_optional_for_nullables) {
            "?"
        } else {
            ""
        };
        let mut ty = member.ty.render(ctx);
        if nullable && !member.is_optional && !config.use_optional_for_nullables {
            ty.push_str(" | null");
        }

        let name = if is_identifier(&member.name) {
            member.name.clone()
        } else {
            quoted(&member.name)
        };
        out.push(format!("{member_indent}{name}{marker}: {ty};"));
    }

    out.push(format!("{indent}}}"));

    if let Some(union) = def.derived_union.as_ref().filter(|u| !u.members.is_empty()) {
        let members: Vec<String> = union.members.iter().map(|m| m.render(ctx)).collect();
        out.push(String::new());
        out.push(format!("{indent}type {} = {};", union.name, members.join(" | ")));
    }
}

fn render_enum(def: &EnumDefinition, config: &Config, indent: &str, out: &mut Vec<String>) {
    if let Some(doc) = &def.doc {
        render_doc(doc, indent, out);
    }

    if def.is_const || config.use_const_enums {
        out.push(format!("{indent}const enum {} {{", def.name));
        for member in &def.members {
            out.push(format!("{indent}  {member} = '{}',", camel_case(member)));
        }
        out.push(format!("{indent}}}"));
    } else if def.members.is_empty() {
        out.push(format!("{indent}type {} = {{}};", def.name));
    } else {
        let values: Vec<String> = def
            .members
            .iter()
            .map(|m| format!("'{}'", camel_case(m)))
            .collect();
        out.push(format!("{indent}type {} = {};", def.name, values.join(" | ")));
    }
}

fn render_doc(doc: &DocComment, indent: &str, out: &mut Vec<String>) {
    if doc.lines.is_empty() && doc.tags.len() == 1 {
        out.push(format!("{indent}/** {} */", doc.tags[0]));
        return;
    }
    out.push(format!("{indent}/**"));
    for line in doc.lines.iter().chain(doc.tags.iter()) {
        out.push(format!("{indent} * {line}"));
    }
    out.push(format!("{indent} */"));
}

fn join_lines(lines: &[String], config: &Config) -> String {
    let mut text = lines.join(&config.new_line);
    text.push_str(&config.new_line);
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts::{DerivedUnion, TsInterfaceMember, TsTypeReference};
    use indoc::indoc;

    fn member(name: &str, ty: TsTypeReference) -> TsInterfaceMember {
        TsInterfaceMember {
            name: name.to_string(),
            ty,
            is_optional: false,
            doc: None,
        }
    }

    fn interface(name: &str, members: Vec<TsInterfaceMember>) -> InterfaceDefinition {
        InterfaceDefinition {
            name: name.to_string(),
            type_params: Vec::new(),
            extends: Vec::new(),
            members,
            derived_union: None,
            discriminant: None,
            must_be_subset_of: Vec::new(),
            doc: None,
        }
    }

    #[test]
    fn test_interface_in_namespace_file() {
        let mut def = interface(
            "Circle",
            vec![
                member("radius", TsTypeReference::primitive("number")),
                member("label", TsTypeReference::primitive("string").with_optional(true)),
                member("0Foo", TsTypeReference::primitive("boolean")),
            ],
        );
        def.extends = vec![TsTypeReference::named("Shape")];
        def.discriminant = Some("$type".to_string());

        let code = render_namespace_file(
            "Api",
            &[TsTypeDefinition::Interface(def)],
            Path::new("/out/Api.d.ts"),
            &Config::default(),
        );
        assert_eq!(
            code,
            indoc! {"
                declare namespace Api {
                  interface Circle extends Shape {
                    $type: 'Circle';
                    radius: number;
                    label?: string;
                    '0Foo': boolean;
                  }
                }
            "}
        );
    }

    #[test]
    fn test_nullable_without_optional_marker() {
        let def = interface(
            "User",
            vec![member("nick", TsTypeReference::primitive("string").with_optional(true))],
        );
        let config = Config {
            use_optional_for_nullables: false,
            ..Config::default()
        };
        let code = render_module_file(
            &TsTypeDefinition::Interface(def),
            Path::new("/out/User.type.ts"),
            &config,
        );
        assert!(code.contains("  nick: string | null;"));
    }

    #[test]
    fn test_quoted_keys_are_escaped() {
        let def = interface("Row", vec![member("it's", TsTypeReference::primitive("number"))]);
        let code = render_module_file(
            &TsTypeDefinition::Interface(def),
            Path::new("/out/Row.type.ts"),
            &Config::default(),
        );
        assert!(code.contains(r"  'it\'s': number;"));
    }

    #[test]
    fn test_module_file_with_imports_and_union() {
        let mut def = interface(
            "Shape",
            vec![member(
                "origin",
                TsTypeReference::imported("Point", "/out/geo/Point.type.ts", true),
            )],
        );
        def.derived_union = Some(DerivedUnion {
            name: "ShapeTypes".to_string(),
            members: vec![
                TsTypeReference::imported("Circle", "/out/Circle.type.ts", true),
                TsTypeReference::imported("Square", "/out/Square.type.ts", true),
            ],
        });

        let code = render_module_file(
            &TsTypeDefinition::Interface(def),
            Path::new("/out/Shape.type.ts"),
            &Config::default(),
        );
        assert_eq!(
            code,
            indoc! {"
                import Circle from './Circle.type';
                import Point from './geo/Point.type';
                import Square from './Square.type';

                interface Shape {
                  origin: Point;
                }

                type ShapeTypes = Circle | Square;

                export type { ShapeTypes };

                export default Shape;
            "}
        );
    }

    #[test]
    fn test_namespace_file_imports_block() {
        let first = interface(
            "Invoice",
            vec![member(
                "total",
                TsTypeReference::imported("Money", "/out/shop/Money.type.ts", true),
            )],
        );
        let second = interface(
            "Refund",
            vec![member(
                "amount",
                TsTypeReference::imported("Money", "/out/bank/Money.type.ts", true),
            )],
        );

        let code = render_namespace_file(
            "Billing",
            &[TsTypeDefinition::Interface(first), TsTypeDefinition::Interface(second)],
            Path::new("/out/Billing.d.ts"),
            &Config::default(),
        );
        assert_eq!(
            code,
            indoc! {"
                declare namespace Billing {
                  namespace __ImportedModules {
                    type Money = import('./shop/Money.type').default;
                    type Money1 = import('./bank/Money.type').default;
                  }

                  interface Invoice {
                    total: __ImportedModules.Money;
                  }

                  interface Refund {
                    amount: __ImportedModules.Money1;
                  }
                }
            "}
        );
    }

    #[test]
    fn test_enum_forms() {
        let def = EnumDefinition {
            name: "Status".to_string(),
            members: vec!["Pending".to_string(), "InProgress".to_string()],
            is_const: false,
            doc: None,
        };
        let config = Config {
            use_const_enums: false,
            ..Config::default()
        };
        let code = render_module_file(
            &TsTypeDefinition::Enum(def.clone()),
            Path::new("/out/Status.type.ts"),
            &config,
        );
        assert_eq!(code, "type Status = 'pending' | 'inProgress';\n\nexport default Status;\n");

        let code = render_module_file(
            &TsTypeDefinition::Enum(def),
            Path::new("/out/Status.type.ts"),
            &Config::default(),
        );
        assert!(code.contains(concat!(
            "const enum Status {\n",
            "  Pending = 'pending',\n",
            "  InProgress = 'inProgress',\n",
            "}",
        )));

        let empty = EnumDefinition {
            name: "Never".to_string(),
            members: Vec::new(),
            is_const: false,
            doc: None,
        };
        let mut lines = Vec::new();
        render_enum(&empty, &config, "", &mut lines);
        assert_eq!(lines, vec!["type Never = {};"]);
    }

    #[test]
    fn test_doc_blocks() {
        let mut lines = Vec::new();
        render_doc(
            &DocComment {
                lines: Vec::new(),
                tags: vec!["@deprecated".to_string()],
            },
            "  ",
            &mut lines,
        );
        render_doc(
            &DocComment {
                lines: vec!["First".to_string(), String::new(), "Second".to_string()],
                tags: vec!["@SourceTypeName crate::User".to_string()],
            },
            "",
            &mut lines,
        );
        assert_eq!(
            lines,
            vec![
                "  /** @deprecated */",
                "/**",
                " * First",
                " * ",
                " * Second",
                " * @SourceTypeName crate::User",
                " */",
            ]
        );
    }

    #[test]
    fn test_structural_subset_check() {
        let mut def =
            interface("Summary", vec![member("id", TsTypeReference::primitive("number"))]);
        def.must_be_subset_of = vec![TsTypeReference::named("Api.User")];
        let code = render_module_file(
            &TsTypeDefinition::Interface(def),
            Path::new("/out/Summary.type.ts"),
            &Config::default(),
        );
        assert!(code.contains("(function() { const v: Summary = {} as Api.User; return v; });"));
    }

    #[test]
    fn test_crlf_newlines() {
        let def = interface("Empty", Vec::new());
        let config = Config {
            new_line: "\r\n".to_string(),
            ..Config::default()
        };
        let code = render_module_file(
            &TsTypeDefinition::Interface(def),
            Path::new("/out/Empty.type.ts"),
            &config,
        );
        assert_eq!(code, "interface Empty {\r\n}\r\n\r\nexport default Empty;\r\n");
    }
}
