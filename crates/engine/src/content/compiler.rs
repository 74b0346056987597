use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use roxmltree::{Document, Node};
use tracing::{debug, info};

use crate::sprite_keys::validate_sprite_key;
use crate::AppPaths;

use super::database::{
    DefDatabase, EnemyDef, EnemyDefId, EnemySprites, MovementType, PlayerDef, SkillDef, SkillDefId,
};
use super::discovery::discover_mod_sources;
use super::types::{ContentPlanError, ContentRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    Discovery,
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDefInMod,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub mod_id: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {} (mod={}, file={}",
            self.code,
            self.message,
            self.mod_id,
            self.file_path.display()
        )?;
        if let Some(loc) = self.location {
            write!(f, ", line={}, column={}", loc.line, loc.column)?;
        }
        write!(f, ")")
    }
}

impl std::error::Error for ContentCompileError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DefKind {
    Enemy,
    Skill,
    Player,
}

impl DefKind {
    fn tag(self) -> &'static str {
        match self {
            DefKind::Enemy => "EnemyDef",
            DefKind::Skill => "SkillDef",
            DefKind::Player => "PlayerDef",
        }
    }
}

#[derive(Debug)]
enum ParsedDef {
    Enemy(EnemyDef),
    Skill(SkillDef),
    Player(PlayerDef),
}

impl ParsedDef {
    fn key(&self) -> (DefKind, String) {
        match self {
            ParsedDef::Enemy(def) => (DefKind::Enemy, def.def_name.clone()),
            ParsedDef::Skill(def) => (DefKind::Skill, def.def_name.clone()),
            ParsedDef::Player(_) => (DefKind::Player, "player".to_string()),
        }
    }
}

/// Compiles `<Defs>` XML from base and every enabled mod into one database.
/// Within a mod each def may appear once; across mods the last one loaded wins.
pub fn compile_def_database(
    app_paths: &AppPaths,
    request: &ContentRequest,
) -> Result<DefDatabase, ContentCompileError> {
    let sources = discover_mod_sources(app_paths, request)
        .map_err(|error| map_discovery_error(error, &app_paths.root))?;

    let mut enemies = BTreeMap::<String, EnemyDef>::new();
    let mut skills = BTreeMap::<String, SkillDef>::new();
    let mut player: Option<PlayerDef> = None;

    for source in sources {
        let xml_files = collect_xml_files_sorted(&source.source_dir)
            .map_err(|error| read_error(&source.mod_id, error.path, error.source))?;
        let mut seen_in_mod = HashSet::<(DefKind, String)>::new();
        let mut def_count = 0usize;

        for xml_file in &xml_files {
            let raw = fs::read_to_string(xml_file)
                .map_err(|source_err| read_error(&source.mod_id, xml_file.clone(), source_err))?;
            for def in parse_defs_document(&source.mod_id, xml_file, &raw)? {
                let (kind, name) = def.key();
                if !seen_in_mod.insert((kind, name.clone())) {
                    return Err(ContentCompileError {
                        code: ContentErrorCode::DuplicateDefInMod,
                        message: format!(
                            "duplicate {} '{}' in mod '{}'; each mod may define it only once",
                            kind.tag(),
                            name,
                            source.mod_id
                        ),
                        mod_id: source.mod_id.clone(),
                        file_path: xml_file.clone(),
                        location: None,
                    });
                }
                def_count += 1;
                match def {
                    ParsedDef::Enemy(def) => {
                        enemies.insert(def.def_name.clone(), def);
                    }
                    ParsedDef::Skill(def) => {
                        skills.insert(def.def_name.clone(), def);
                    }
                    ParsedDef::Player(def) => player = Some(def),
                }
            }
        }
        debug!(
            mod_id = %source.mod_id,
            mod_load_index = source.mod_load_index,
            xml_files = xml_files.len(),
            def_count,
            "content_mod_compiled"
        );
    }

    let database = DefDatabase::from_defs(
        enemies.into_values().collect(),
        skills.into_values().collect(),
        player,
    );
    info!(
        enemy_defs = database.enemy_defs().len(),
        skill_defs = database.skill_defs().len(),
        "content_compiled"
    );
    Ok(database)
}

struct ParseContext<'c, 'input> {
    mod_id: &'c str,
    file_path: &'c Path,
    doc: &'c Document<'input>,
}

impl ParseContext<'_, '_> {
    fn error_at(
        &self,
        code: ContentErrorCode,
        message: String,
        node: Node<'_, '_>,
    ) -> ContentCompileError {
        let pos = self.doc.text_pos_at(node.range().start);
        ContentCompileError {
            code,
            message,
            mod_id: self.mod_id.to_string(),
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }
}

fn parse_defs_document(
    mod_id: &str,
    file_path: &Path,
    raw: &str,
) -> Result<Vec<ParsedDef>, ContentCompileError> {
    let doc = Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        mod_id: mod_id.to_string(),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let ctx = ParseContext {
        mod_id,
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err(ctx.error_at(
            ContentErrorCode::InvalidRoot,
            "root element must be <Defs>".to_string(),
            root,
        ));
    }

    let mut defs = Vec::new();
    for child in root.children().filter(|node| node.is_element()) {
        let parsed = match child.tag_name().name() {
            "EnemyDef" => ParsedDef::Enemy(parse_enemy_def(&ctx, child)?),
            "SkillDef" => ParsedDef::Skill(parse_skill_def(&ctx, child)?),
            "PlayerDef" => ParsedDef::Player(parse_player_def(&ctx, child)?),
            other => {
                return Err(ctx.error_at(
                    ContentErrorCode::UnknownDefType,
                    format!(
                        "unsupported def type <{other}>; expected <EnemyDef>, <SkillDef> or <PlayerDef>"
                    ),
                    child,
                ))
            }
        };
        defs.push(parsed);
    }

    Ok(defs)
}

const ENEMY_FIELDS: &[&str] = &[
    "defName",
    "label",
    "maxHealth",
    "width",
    "height",
    "movement",
    "color",
    "idleSprite",
    "walkSprite",
    "combatSprite",
];

fn parse_enemy_def(
    ctx: &ParseContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<EnemyDef, ContentCompileError> {
    let fields = DefFields::collect(ctx, node, DefKind::Enemy, ENEMY_FIELDS)?;

    let def_name = fields.required_text(ctx, "defName")?;
    let label = fields.required_text(ctx, "label")?;
    let max_health = fields.required_number(ctx, "maxHealth", positive_f32, "finite and > 0")?;
    let width = fields
        .optional_number(ctx, "width", positive_f32, "finite and > 0")?
        .unwrap_or(32.0);
    let height = fields
        .optional_number(ctx, "height", positive_f32, "finite and > 0")?
        .unwrap_or(32.0);

    let (movement_node, movement_raw) = fields.required_field(ctx, "movement")?;
    let Some(movement) = MovementType::parse(&movement_raw) else {
        return Err(ctx.error_at(
            ContentErrorCode::InvalidValue,
            format!(
                "invalid movement '{movement_raw}'; allowed values: stationary, wander_cardinal"
            ),
            movement_node,
        ));
    };

    let color = match fields.field_text(ctx, "color")? {
        Some((color_node, value)) if !is_hex_color(&value) => {
            return Err(ctx.error_at(
                ContentErrorCode::InvalidValue,
                format!("color '{value}' must look like #rrggbb"),
                color_node,
            ))
        }
        other => other.map(|(_, value)| value),
    };

    let idle = fields
        .sprite(ctx, "idleSprite")?
        .ok_or_else(|| fields.missing(ctx, "idleSprite"))?;
    let walk = fields
        .sprite(ctx, "walkSprite")?
        .unwrap_or_else(|| idle.clone());
    let combat = fields
        .sprite(ctx, "combatSprite")?
        .unwrap_or_else(|| idle.clone());

    Ok(EnemyDef {
        id: EnemyDefId(0),
        def_name,
        label,
        max_health,
        width,
        height,
        movement,
        color,
        sprites: EnemySprites { idle, walk, combat },
    })
}

const SKILL_FIELDS: &[&str] = &[
    "defName",
    "label",
    "damage",
    "cooldownMs",
    "manaCost",
    "frameCount",
    "animationSpeed",
    "sprite",
];

fn parse_skill_def(
    ctx: &ParseContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<SkillDef, ContentCompileError> {
    let fields = DefFields::collect(ctx, node, DefKind::Skill, SKILL_FIELDS)?;

    Ok(SkillDef {
        id: SkillDefId(0),
        def_name: fields.required_text(ctx, "defName")?,
        label: fields.required_text(ctx, "label")?,
        damage: fields.required_number(ctx, "damage", non_negative_f32, "finite and >= 0")?,
        cooldown_ms: fields.required_number(
            ctx,
            "cooldownMs",
            |value: &f64| value.is_finite() && *value >= 0.0,
            "finite and >= 0",
        )?,
        mana_cost: fields
            .optional_number(ctx, "manaCost", non_negative_f32, "finite and >= 0")?
            .unwrap_or(0.0),
        frame_count: fields.required_number(ctx, "frameCount", |value: &u32| *value > 0, "> 0")?,
        animation_speed: fields.required_number(
            ctx,
            "animationSpeed",
            positive_f32,
            "finite and > 0",
        )?,
        sprite: fields.sprite(ctx, "sprite")?,
    })
}

const PLAYER_FIELDS: &[&str] = &[
    "maxHealth",
    "maxMana",
    "healthRegen",
    "manaRegen",
    "width",
    "height",
    "walkSpeed",
    "runSpeed",
];

fn parse_player_def(
    ctx: &ParseContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<PlayerDef, ContentCompileError> {
    let fields = DefFields::collect(ctx, node, DefKind::Player, PLAYER_FIELDS)?;
    let defaults = PlayerDef::default();
    let positive = |name: &str, fallback: f32| {
        fields
            .optional_number(ctx, name, positive_f32, "finite and > 0")
            .map(|value| value.unwrap_or(fallback))
    };
    let non_negative = |name: &str, fallback: f32| {
        fields
            .optional_number(ctx, name, non_negative_f32, "finite and >= 0")
            .map(|value| value.unwrap_or(fallback))
    };

    Ok(PlayerDef {
        max_health: positive("maxHealth", defaults.max_health)?,
        max_mana: non_negative("maxMana", defaults.max_mana)?,
        health_regen: non_negative("healthRegen", defaults.health_regen)?,
        mana_regen: non_negative("manaRegen", defaults.mana_regen)?,
        width: positive("width", defaults.width)?,
        height: positive("height", defaults.height)?,
        walk_speed: positive("walkSpeed", defaults.walk_speed)?,
        run_speed: positive("runSpeed", defaults.run_speed)?,
    })
}

/// Child elements of one def, checked against the allowed field list.
struct DefFields<'a, 'input> {
    kind: DefKind,
    owner: Node<'a, 'input>,
    nodes: HashMap<String, Node<'a, 'input>>,
}

impl<'a, 'input> DefFields<'a, 'input> {
    fn collect(
        ctx: &ParseContext<'_, '_>,
        owner: Node<'a, 'input>,
        kind: DefKind,
        allowed: &[&str],
    ) -> Result<Self, ContentCompileError> {
        let mut nodes = HashMap::new();
        for field in owner.children().filter(|child| child.is_element()) {
            let field_name = field.tag_name().name().to_string();
            if nodes.contains_key(&field_name) {
                return Err(ctx.error_at(
                    ContentErrorCode::DuplicateField,
                    format!("duplicate field <{field_name}> in <{}>", kind.tag()),
                    field,
                ));
            }
            if !allowed.contains(&field_name.as_str()) {
                return Err(ctx.error_at(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{field_name}> in <{}>", kind.tag()),
                    field,
                ));
            }
            nodes.insert(field_name, field);
        }
        Ok(Self { kind, owner, nodes })
    }

    fn missing(&self, ctx: &ParseContext<'_, '_>, field_name: &str) -> ContentCompileError {
        ctx.error_at(
            ContentErrorCode::MissingField,
            format!(
                "missing required field <{field_name}> in <{}>",
                self.kind.tag()
            ),
            self.owner,
        )
    }

    fn field_text(
        &self,
        ctx: &ParseContext<'_, '_>,
        field_name: &str,
    ) -> Result<Option<(Node<'a, 'input>, String)>, ContentCompileError> {
        let Some(node) = self.nodes.get(field_name).copied() else {
            return Ok(None);
        };
        let value = node.text().map(str::trim).unwrap_or_default().to_string();
        if value.is_empty() {
            return Err(ctx.error_at(
                ContentErrorCode::MissingField,
                format!("field <{field_name}> must not be empty"),
                node,
            ));
        }
        Ok(Some((node, value)))
    }

    fn required_field(
        &self,
        ctx: &ParseContext<'_, '_>,
        field_name: &str,
    ) -> Result<(Node<'a, 'input>, String), ContentCompileError> {
        self.field_text(ctx, field_name)?
            .ok_or_else(|| self.missing(ctx, field_name))
    }

    fn required_text(
        &self,
        ctx: &ParseContext<'_, '_>,
        field_name: &str,
    ) -> Result<String, ContentCompileError> {
        self.required_field(ctx, field_name).map(|(_, value)| value)
    }

    fn optional_number<T: FromStr>(
        &self,
        ctx: &ParseContext<'_, '_>,
        field_name: &str,
        is_valid: impl Fn(&T) -> bool,
        requirement: &str,
    ) -> Result<Option<T>, ContentCompileError> {
        let Some((node, value)) = self.field_text(ctx, field_name)? else {
            return Ok(None);
        };
        let parsed = value.parse::<T>().map_err(|_| {
            ctx.error_at(
                ContentErrorCode::InvalidValue,
                format!("{field_name} '{value}' is not a valid number"),
                node,
            )
        })?;
        if !is_valid(&parsed) {
            return Err(ctx.error_at(
                ContentErrorCode::InvalidValue,
                format!("{field_name} must be {requirement}"),
                node,
            ));
        }
        Ok(Some(parsed))
    }

    fn required_number<T: FromStr>(
        &self,
        ctx: &ParseContext<'_, '_>,
        field_name: &str,
        is_valid: impl Fn(&T) -> bool,
        requirement: &str,
    ) -> Result<T, ContentCompileError> {
        self.optional_number(ctx, field_name, is_valid, requirement)?
            .ok_or_else(|| self.missing(ctx, field_name))
    }

    fn sprite(
        &self,
        ctx: &ParseContext<'_, '_>,
        field_name: &str,
    ) -> Result<Option<String>, ContentCompileError> {
        let Some((node, value)) = self.field_text(ctx, field_name)? else {
            return Ok(None);
        };
        validate_sprite_key(&value).map_err(|error| {
            ctx.error_at(
                ContentErrorCode::InvalidValue,
                format!("{field_name} '{value}': {error}"),
                node,
            )
        })?;
        Ok(Some(value))
    }
}

fn positive_f32(value: &f32) -> bool {
    value.is_finite() && *value > 0.0
}

fn non_negative_f32(value: &f32) -> bool {
    value.is_finite() && *value >= 0.0
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|ch| ch.is_ascii_hexdigit())
}

struct ReadError {
    path: PathBuf,
    source: std::io::Error,
}

fn collect_xml_files_sorted(root: &Path) -> Result<Vec<PathBuf>, ReadError> {
    let mut files = Vec::<PathBuf>::new();
    collect_recursive(root, &mut files)?;
    files.sort_by_cached_key(|path| normalize_rel_path(path.strip_prefix(root).unwrap_or(path)));
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

fn read_error(mod_id: &str, path: PathBuf, source: std::io::Error) -> ContentCompileError {
    ContentCompileError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read content: {source}"),
        mod_id: mod_id.to_string(),
        file_path: path,
        location: None,
    }
}

fn map_discovery_error(error: ContentPlanError, root: &Path) -> ContentCompileError {
    match error {
        ContentPlanError::EnabledModMissing {
            mod_id,
            expected_dir,
        } => ContentCompileError {
            code: ContentErrorCode::Discovery,
            message: format!(
                "enabled mod '{}' not found at {}; check TILEGAME_ENABLED_MODS",
                mod_id,
                expected_dir.display()
            ),
            mod_id,
            file_path: expected_dir,
            location: None,
        },
        other => ContentCompileError {
            code: ContentErrorCode::Discovery,
            message: other.to_string(),
            mod_id: "<discovery>".to_string(),
            file_path: root.to_path_buf(),
            location: None,
        },
    }
}
