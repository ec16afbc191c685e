use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::info;

use crate::app::Vec3;

use super::catalog::{EntryPointDef, ExitDef, LevelCatalog, LevelDef, LevelRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateLevel,
    UnknownExitTarget,
    EmptyCatalog,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentCompileError {}

/// Compiles every `*.xml` file under `levels_dir` (sorted by relative path) into one
/// catalog. Level names are unique across files and every exit must name a known level.
pub fn compile_level_catalog(levels_dir: &Path) -> Result<LevelCatalog, ContentCompileError> {
    let xml_files = collect_xml_files_sorted(levels_dir)
        .map_err(|error| read_error(error.path, error.source))?;

    let mut sourced = Vec::<(PathBuf, LevelDef)>::new();
    for xml_file in xml_files {
        let raw = fs::read_to_string(&xml_file)
            .map_err(|source| read_error(xml_file.clone(), source))?;
        for level in parse_levels_document(&xml_file, &raw)? {
            sourced.push((xml_file.clone(), level));
        }
    }

    if sourced.is_empty() {
        return Err(ContentCompileError {
            code: ContentErrorCode::EmptyCatalog,
            message: "no <LevelDef> found; add at least one XML file under assets/levels"
                .to_string(),
            file_path: levels_dir.to_path_buf(),
            location: None,
        });
    }

    let catalog = validate_and_build(sourced)?;
    info!(
        levels_dir = %levels_dir.display(),
        level_count = catalog.len(),
        "level_catalog_compiled"
    );
    Ok(catalog)
}

/// Single-document variant used for embedded catalogs and tests.
pub fn compile_level_catalog_from_str(
    file_path: &Path,
    raw: &str,
) -> Result<LevelCatalog, ContentCompileError> {
    let levels = parse_levels_document(file_path, raw)?;
    validate_and_build(
        levels
            .into_iter()
            .map(|level| (file_path.to_path_buf(), level))
            .collect(),
    )
}

fn validate_and_build(
    sourced: Vec<(PathBuf, LevelDef)>,
) -> Result<LevelCatalog, ContentCompileError> {
    let mut names = HashSet::<&str>::new();
    for (file_path, level) in &sourced {
        if !names.insert(level.name.as_str()) {
            return Err(ContentCompileError {
                code: ContentErrorCode::DuplicateLevel,
                message: format!(
                    "duplicate LevelDef '{}'; level names must be unique across the catalog",
                    level.name
                ),
                file_path: file_path.clone(),
                location: None,
            });
        }
    }

    for (file_path, level) in &sourced {
        if let Some(exit) = level
            .exits
            .iter()
            .find(|exit| !names.contains(exit.target_level.as_str()))
        {
            return Err(ContentCompileError {
                code: ContentErrorCode::UnknownExitTarget,
                message: format!(
                    "exit in level '{}' targets unknown level '{}'",
                    level.name, exit.target_level
                ),
                file_path: file_path.clone(),
                location: None,
            });
        }
    }

    Ok(LevelCatalog::from_levels(
        sourced.into_iter().map(|(_, level)| level).collect(),
    ))
}

fn parse_levels_document(
    file_path: &Path,
    raw: &str,
) -> Result<Vec<LevelDef>, ContentCompileError> {
    let doc = Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "Levels" {
        return Err(error_at_node(
            ContentErrorCode::InvalidRoot,
            "root element must be <Levels>".to_string(),
            file_path,
            &doc,
            root,
        ));
    }

    let mut levels = Vec::<LevelDef>::new();
    for child in root.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "LevelDef" {
            return Err(error_at_node(
                ContentErrorCode::UnknownDefType,
                format!(
                    "unsupported def type <{}>; only <LevelDef> is allowed",
                    child.tag_name().name()
                ),
                file_path,
                &doc,
                child,
            ));
        }
        levels.push(parse_level_def(file_path, &doc, child)?);
    }

    Ok(levels)
}

fn parse_level_def(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<LevelDef, ContentCompileError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut name: Option<String> = None;
    let mut role: Option<LevelRole> = None;
    let mut restricted = false;
    let mut finale = false;
    let mut hostiles = 0u32;
    let mut player_start = Vec3::ZERO;
    let mut entries = Vec::<EntryPointDef>::new();
    let mut exits = Vec::<ExitDef>::new();

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        if !seen_fields.insert(field_name.clone()) {
            return Err(error_at_node(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{}> in <LevelDef>", field_name),
                file_path,
                doc,
                field,
            ));
        }

        match field_name.as_str() {
            "name" => {
                name = Some(required_text(file_path, doc, field, "name")?);
            }
            "role" => {
                let value = required_text(file_path, doc, field, "role")?;
                let parsed = LevelRole::parse(&value).ok_or_else(|| {
                    error_at_node(
                        ContentErrorCode::InvalidValue,
                        format!(
                            "invalid role '{}'; allowed values: Gameplay, SuspendMenu, Victory, Defeat",
                            value
                        ),
                        file_path,
                        doc,
                        field,
                    )
                })?;
                role = Some(parsed);
            }
            "restricted" => {
                restricted = parse_bool_field(file_path, doc, field, "restricted")?;
            }
            "finale" => {
                finale = parse_bool_field(file_path, doc, field, "finale")?;
            }
            "hostiles" => {
                let value = required_text(file_path, doc, field, "hostiles")?;
                hostiles = value.parse::<u32>().map_err(|_| {
                    error_at_node(
                        ContentErrorCode::InvalidValue,
                        format!("hostiles '{}' is not a non-negative integer", value),
                        file_path,
                        doc,
                        field,
                    )
                })?;
            }
            "playerStart" => {
                player_start = parse_vec3_field(file_path, doc, field, "playerStart")?;
            }
            "entries" => {
                for item in list_items(file_path, doc, field, "entries")? {
                    entries.push(parse_entry(file_path, doc, item)?);
                }
            }
            "exits" => {
                for item in list_items(file_path, doc, field, "exits")? {
                    exits.push(parse_exit(file_path, doc, item)?);
                }
            }
            _ => {
                return Err(error_at_node(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{}> in <LevelDef>", field_name),
                    file_path,
                    doc,
                    field,
                ))
            }
        }
    }

    let Some(name) = name else {
        return Err(error_at_node(
            ContentErrorCode::MissingField,
            "missing required field <name> in <LevelDef>".to_string(),
            file_path,
            doc,
            node,
        ));
    };
    let Some(role) = role else {
        return Err(error_at_node(
            ContentErrorCode::MissingField,
            format!("missing required field <role> in <LevelDef> '{}'", name),
            file_path,
            doc,
            node,
        ));
    };
    if !role.is_gameplay() && (restricted || finale || !exits.is_empty()) {
        return Err(error_at_node(
            ContentErrorCode::InvalidValue,
            format!(
                "level '{}' has role {:?}; restricted, finale and exits apply to Gameplay levels only",
                name, role
            ),
            file_path,
            doc,
            node,
        ));
    }

    Ok(LevelDef {
        name,
        role,
        restricted,
        finale,
        initial_hostiles: hostiles,
        player_start,
        entries,
        exits,
    })
}

fn parse_entry(
    file_path: &Path,
    doc: &Document<'_>,
    item: Node<'_, '_>,
) -> Result<EntryPointDef, ContentCompileError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut tag: Option<String> = None;
    let mut position: Option<Vec3> = None;

    for field in item.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        if !seen_fields.insert(field_name.clone()) {
            return Err(error_at_node(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{}> in entry <li>", field_name),
                file_path,
                doc,
                field,
            ));
        }
        match field_name.as_str() {
            "tag" => tag = Some(required_text(file_path, doc, field, "tag")?),
            "position" => position = Some(parse_vec3_field(file_path, doc, field, "position")?),
            _ => {
                return Err(error_at_node(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{}> in entry <li>", field_name),
                    file_path,
                    doc,
                    field,
                ))
            }
        }
    }

    match (tag, position) {
        (Some(tag), Some(position)) => Ok(EntryPointDef { tag, position }),
        _ => Err(error_at_node(
            ContentErrorCode::MissingField,
            "entry <li> requires <tag> and <position>".to_string(),
            file_path,
            doc,
            item,
        )),
    }
}

fn parse_exit(
    file_path: &Path,
    doc: &Document<'_>,
    item: Node<'_, '_>,
) -> Result<ExitDef, ContentCompileError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut target: Option<String> = None;
    let mut tag = String::new();

    for field in item.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        if !seen_fields.insert(field_name.clone()) {
            return Err(error_at_node(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{}> in exit <li>", field_name),
                file_path,
                doc,
                field,
            ));
        }
        match field_name.as_str() {
            "target" => target = Some(required_text(file_path, doc, field, "target")?),
            // An empty tag is legal: the target level then keeps its placed spawn.
            "tag" => tag = field.text().map(str::trim).unwrap_or_default().to_string(),
            _ => {
                return Err(error_at_node(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{}> in exit <li>", field_name),
                    file_path,
                    doc,
                    field,
                ))
            }
        }
    }

    let Some(target_level) = target else {
        return Err(error_at_node(
            ContentErrorCode::MissingField,
            "exit <li> requires <target>".to_string(),
            file_path,
            doc,
            item,
        ));
    };
    Ok(ExitDef {
        target_level,
        transition_tag: tag,
    })
}

fn list_items<'a, 'input>(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'a, 'input>,
    field_name: &str,
) -> Result<Vec<Node<'a, 'input>>, ContentCompileError> {
    let mut items = Vec::new();
    for child in node.children().filter(|child| child.is_element()) {
        if child.tag_name().name() != "li" {
            return Err(error_at_node(
                ContentErrorCode::UnknownField,
                format!(
                    "<{}> may only contain <li> items, found <{}>",
                    field_name,
                    child.tag_name().name()
                ),
                file_path,
                doc,
                child,
            ));
        }
        items.push(child);
    }
    Ok(items)
}

fn parse_bool_field(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<bool, ContentCompileError> {
    let value = required_text(file_path, doc, node, field_name)?;
    match value.as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(error_at_node(
            ContentErrorCode::InvalidValue,
            format!("{} '{}' must be true or false", field_name, value),
            file_path,
            doc,
            node,
        )),
    }
}

fn parse_vec3_field(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<Vec3, ContentCompileError> {
    let value = required_text(file_path, doc, node, field_name)?;
    let invalid = || {
        error_at_node(
            ContentErrorCode::InvalidValue,
            format!(
                "{} '{}' must be three finite numbers separated by whitespace",
                field_name, value
            ),
            file_path,
            doc,
            node,
        )
    };

    let components = value
        .split_whitespace()
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;
    let [x, y, z] = components.as_slice() else {
        return Err(invalid());
    };
    let parsed = Vec3::new(*x, *y, *z);
    if !parsed.is_finite() {
        return Err(invalid());
    }
    Ok(parsed)
}

fn required_text(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<String, ContentCompileError> {
    let value = node.text().map(str::trim).unwrap_or_default().to_string();
    if value.is_empty() {
        return Err(error_at_node(
            ContentErrorCode::MissingField,
            format!("field <{}> must not be empty", field_name),
            file_path,
            doc,
            node,
        ));
    }
    Ok(value)
}

fn error_at_node(
    code: ContentErrorCode,
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> ContentCompileError {
    let pos = doc.text_pos_at(node.range().start);
    ContentCompileError {
        code,
        message,
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}

struct ReadError {
    path: PathBuf,
    source: std::io::Error,
}

fn collect_xml_files_sorted(root: &Path) -> Result<Vec<PathBuf>, ReadError> {
    let mut files = Vec::<PathBuf>::new();
    collect_recursive(root, &mut files)?;
    files.sort_by_key(|path| normalize_rel_path(path.strip_prefix(root).unwrap_or(path.as_path())));
    Ok(files)
}

fn collect_recursive(current: &Path, files: &mut Vec<PathBuf>) -> Result<(), ReadError> {
    let entries = fs::read_dir(current).map_err(|source| ReadError {
        path: current.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ReadError {
            path: current.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(&path, files)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        {
            files.push(path);
        }
    }
    Ok(())
}

fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_error(path: PathBuf, source: std::io::Error) -> ContentCompileError {
    ContentCompileError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read level catalog: {source}"),
        file_path: path,
        location: None,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    const TWO_LEVELS: &str = r#"<Levels>
        <LevelDef>
            <name>Scene1</name>
            <role>Gameplay</role>
            <restricted>true</restricted>
            <hostiles>2</hostiles>
            <playerStart>0 1 0</playerStart>
            <entries>
                <li><tag>from_scene2</tag><position>8 0 0</position></li>
            </entries>
            <exits>
                <li><target>Scene2</target><tag>from_scene1</tag></li>
            </exits>
        </LevelDef>
        <LevelDef>
            <name>Scene2</name>
            <role>Gameplay</role>
            <exits>
                <li><target>Scene1</target><tag>from_scene2</tag></li>
            </exits>
        </LevelDef>
    </Levels>"#;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }

    fn compile_str(raw: &str) -> Result<LevelCatalog, ContentCompileError> {
        compile_level_catalog_from_str(Path::new("levels.xml"), raw)
    }

    #[test]
    fn valid_document_compiles_all_fields() {
        let catalog = compile_str(TWO_LEVELS).expect("compile");

        let scene1 = catalog.level("Scene1").expect("scene1");
        assert_eq!(scene1.role, LevelRole::Gameplay);
        assert!(scene1.restricted);
        assert!(!scene1.finale);
        assert_eq!(scene1.initial_hostiles, 2);
        assert_eq!(scene1.player_start, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(
            scene1.entry_for_tag("from_scene2").map(|entry| entry.position),
            Some(Vec3::new(8.0, 0.0, 0.0))
        );
        assert_eq!(scene1.exits[0].target_level, "Scene2");

        let scene2 = catalog.level("Scene2").expect("scene2");
        assert!(!scene2.restricted);
        assert_eq!(scene2.initial_hostiles, 0);
        assert_eq!(scene2.player_start, Vec3::ZERO);
    }

    #[test]
    fn missing_role_reports_location() {
        let err = compile_str("<Levels><LevelDef><name>Scene1</name></LevelDef></Levels>")
            .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::MissingField);
        assert!(err.location.is_some());
    }

    #[test]
    fn unknown_field_errors() {
        let err = compile_str(
            "<Levels><LevelDef><name>a</name><role>Gameplay</role><weather>rain</weather></LevelDef></Levels>",
        )
        .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::UnknownField);
    }

    #[test]
    fn invalid_role_errors() {
        let err =
            compile_str("<Levels><LevelDef><name>a</name><role>Boss</role></LevelDef></Levels>")
                .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn bad_vector_errors() {
        let err = compile_str(
            "<Levels><LevelDef><name>a</name><role>Gameplay</role><playerStart>1 2</playerStart></LevelDef></Levels>",
        )
        .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn menu_level_cannot_be_restricted() {
        let err = compile_str(
            "<Levels><LevelDef><name>Win</name><role>Victory</role><restricted>true</restricted></LevelDef></Levels>",
        )
        .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn malformed_xml_reports_location() {
        let err = compile_str("<Levels><LevelDef><name>a</name></Levels>").expect_err("err");
        assert_eq!(err.code, ContentErrorCode::XmlMalformed);
        assert!(err.location.is_some());
    }

    #[test]
    fn exit_to_unknown_level_errors() {
        let err = compile_str(
            "<Levels><LevelDef><name>a</name><role>Gameplay</role><exits><li><target>nowhere</target></li></exits></LevelDef></Levels>",
        )
        .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::UnknownExitTarget);
    }

    #[test]
    fn duplicate_level_across_files_errors() {
        let temp = TempDir::new().expect("temp");
        let level = "<Levels><LevelDef><name>Scene1</name><role>Gameplay</role></LevelDef></Levels>";
        write_file(&temp.path().join("a.xml"), level);
        write_file(&temp.path().join("nested").join("b.xml"), level);

        let err = compile_level_catalog(temp.path()).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::DuplicateLevel);
        assert!(err.file_path.ends_with(Path::new("nested").join("b.xml")));
    }

    #[test]
    fn directory_compile_merges_files() {
        let temp = TempDir::new().expect("temp");
        write_file(&temp.path().join("gameplay.xml"), TWO_LEVELS);
        write_file(
            &temp.path().join("menus.xml"),
            "<Levels><LevelDef><name>Continue</name><role>SuspendMenu</role></LevelDef></Levels>",
        );
        write_file(&temp.path().join("notes.txt"), "ignored");

        let catalog = compile_level_catalog(temp.path()).expect("compile");
        assert_eq!(catalog.len(), 3);
        assert_eq!(
            catalog.level("Continue").map(|level| level.role),
            Some(LevelRole::SuspendMenu)
        );
    }

    #[test]
    fn empty_directory_errors() {
        let temp = TempDir::new().expect("temp");
        let err = compile_level_catalog(temp.path()).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::EmptyCatalog);
    }

    #[test]
    fn shipped_catalog_compiles() {
        let levels_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("assets")
            .join("levels");
        let catalog = compile_level_catalog(&levels_dir).expect("compile");
        for name in ["Scene1", "Scene2", "Scene3", "Continue", "Win", "Die"] {
            assert!(catalog.contains(name), "missing {name}");
        }
        assert!(catalog.level("Scene3").expect("scene3").finale);
    }
}
