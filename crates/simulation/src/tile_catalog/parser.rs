//! Reader for the textual tile catalog.
//!
//! One `name attributes…` entry per line. Numeric names `0..n` are tiles and
//! must be contiguous; any other name defines an attribute macro that is
//! expanded into every tile carrying an attribute of the same key. Lines
//! starting with `#` are comments.
//!
//! ```text
//! # macro
//! zone-part (conducts)
//! 0   dirt (noburn) (description=#1)
//! 56  fire1 (behavior=FIRE) (becomes=57)
//! 244 resclr (zone-part) (zone) (building=3x3) (behavior=RESIDENTIAL)
//! ```

use std::collections::{BTreeMap, HashMap};

use super::{BuildingInfo, TileBehavior, TileCatalog, TileSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A line could not be tokenized.
    Syntax { line: usize, message: String },
    /// Tile numbers must run `0..n` without gaps.
    MissingTile(u16),
    /// `becomes`, `onpower`, `onshutdown` or `building-part` names an unknown tile.
    UnknownReference { tile: u16, name: String },
    UnknownBehavior { tile: u16, name: String },
    /// A numeric attribute did not parse.
    BadValue {
        tile: u16,
        key: String,
        value: String,
    },
    /// A building footprint extends outside the catalog.
    BadBuilding { tile: u16 },
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Syntax { line, message } => write!(f, "line {line}: {message}"),
            CatalogError::MissingTile(n) => write!(f, "tile {n} is not defined"),
            CatalogError::UnknownReference { tile, name } => {
                write!(f, "tile {tile} references unknown tile '{name}'")
            }
            CatalogError::UnknownBehavior { tile, name } => {
                write!(f, "tile {tile} has unknown behavior '{name}'")
            }
            CatalogError::BadValue { tile, key, value } => {
                write!(f, "tile {tile}: bad value '{value}' for '{key}'")
            }
            CatalogError::BadBuilding { tile } => write!(f, "tile {tile}: bad building footprint"),
        }
    }
}

impl std::error::Error for CatalogError {}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

enum Token {
    Attr(String, String),
    Image,
}

fn tokenize(text: &str, line: usize) -> Result<Vec<Token>, CatalogError> {
    let syntax = |message: &str| CatalogError::Syntax {
        line,
        message: message.to_string(),
    };
    let mut out = Vec::new();
    let mut chars = text.chars().peekable();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.peek().copied() {
            None => break,
            Some('(') => {
                chars.next();
                let mut key = String::new();
                while let Some(&c) = chars.peek() {
                    if c == '-' || c.is_alphanumeric() {
                        key.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if key.is_empty() {
                    return Err(syntax("empty attribute key"));
                }
                let mut value = "true".to_string();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    value = read_string(&mut chars);
                }
                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
                if chars.next() != Some(')') {
                    return Err(syntax("expected ')'"));
                }
                out.push(Token::Attr(key, value));
            }
            Some('|') | Some(',') => {
                chars.next();
            }
            Some(_) => {
                read_string(&mut chars);
                out.push(Token::Image);
            }
        }
    }
    Ok(out)
}

fn read_string(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut s = String::new();
    if chars.peek() == Some(&'"') {
        chars.next();
        for c in chars.by_ref() {
            if c == '"' {
                break;
            }
            s.push(c);
        }
        return s;
    }
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() || c == ')' || c == '|' {
            break;
        }
        s.push(c);
        chars.next();
    }
    s
}

// ---------------------------------------------------------------------------
// Attribute expansion
// ---------------------------------------------------------------------------

/// Later attributes override earlier ones. A macro expands only the first
/// time its key is seen, so self-referencing macros terminate.
fn expand(
    tokens: &[Token],
    macros: &HashMap<String, Vec<Token>>,
    attrs: &mut BTreeMap<String, String>,
) {
    for token in tokens {
        let Token::Attr(k, v) = token else { continue };
        let fresh = !attrs.contains_key(k);
        attrs.insert(k.clone(), v.clone());
        if let (true, Some(sup)) = (fresh, macros.get(k)) {
            expand(sup, macros, attrs);
        }
    }
}

fn flag(attrs: &BTreeMap<String, String>, key: &str) -> bool {
    attrs.get(key).is_some_and(|v| v == "true")
}

fn number(
    tile: u16,
    attrs: &BTreeMap<String, String>,
    key: &str,
) -> Result<Option<i32>, CatalogError> {
    let Some(v) = attrs.get(key) else {
        return Ok(None);
    };
    let digits = v.strip_prefix('#').unwrap_or(v);
    digits
        .parse::<i32>()
        .map(Some)
        .map_err(|_| CatalogError::BadValue {
            tile,
            key: key.to_string(),
            value: v.clone(),
        })
}

// ---------------------------------------------------------------------------
// Parse
// ---------------------------------------------------------------------------

pub(super) fn parse(text: &str) -> Result<TileCatalog, CatalogError> {
    let mut tiles: BTreeMap<u16, (String, Vec<Token>)> = BTreeMap::new();
    let mut macros: HashMap<String, Vec<Token>> = HashMap::new();

    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (name, rest) = line
            .split_once(char::is_whitespace)
            .unwrap_or((line, ""));
        let tokens = tokenize(rest, i + 1)?;
        match name.parse::<u16>() {
            Ok(n) => {
                let label = tokens_label(rest).unwrap_or_else(|| name.to_string());
                tiles.insert(n, (label, tokens));
            }
            Err(_) => {
                macros.insert(name.to_string(), tokens);
            }
        }
    }

    let count = tiles.keys().next_back().map_or(0, |&n| n as usize + 1);
    let mut names: HashMap<String, u16> = HashMap::new();
    let mut raw_attrs = Vec::with_capacity(count);
    for n in 0..count as u16 {
        let (label, tokens) = tiles.get(&n).ok_or(CatalogError::MissingTile(n))?;
        let mut attrs = BTreeMap::new();
        expand(tokens, &macros, &mut attrs);
        names.insert(n.to_string(), n);
        names.entry(label.clone()).or_insert(n);
        raw_attrs.push(attrs);
    }

    let lookup = |tile: u16, name: &str| -> Result<u16, CatalogError> {
        names
            .get(name)
            .copied()
            .ok_or_else(|| CatalogError::UnknownReference {
                tile,
                name: name.to_string(),
            })
    };

    let mut specs = Vec::with_capacity(count);
    for (n, attrs) in raw_attrs.iter().enumerate() {
        let n = n as u16;
        let mut spec = TileSpec {
            number: n,
            name: tiles.get(&n).map(|(l, _)| l.clone()).unwrap_or_default(),
            bulldozable: flag(attrs, "bulldozable"),
            burnable: !flag(attrs, "noburn"),
            conductive: flag(attrs, "conducts"),
            overwater: flag(attrs, "overwater"),
            zone: flag(attrs, "zone"),
            population: number(n, attrs, "population")?.unwrap_or(0),
            pollution: number(n, attrs, "pollution")?,
            description: number(n, attrs, "description")?,
            ..Default::default()
        };
        if let Some(v) = attrs.get("becomes") {
            spec.anim_next = Some(lookup(n, v)?);
        }
        if let Some(v) = attrs.get("onpower") {
            spec.on_power = Some(lookup(n, v)?);
        }
        if let Some(v) = attrs.get("onshutdown") {
            spec.on_shutdown = Some(lookup(n, v)?);
        }
        if let Some(v) = attrs.get("behavior") {
            spec.behavior = Some(TileBehavior::from_name(v).ok_or_else(|| {
                CatalogError::UnknownBehavior {
                    tile: n,
                    name: v.clone(),
                }
            })?);
        }
        if let Some(v) = attrs.get("building-part") {
            let bad = || CatalogError::BadValue {
                tile: n,
                key: "building-part".into(),
                value: v.clone(),
            };
            let parts: Vec<&str> = v.split(',').collect();
            let [owner, dx, dy] = parts[..] else {
                return Err(bad());
            };
            let dx: i32 = dx.trim().parse().map_err(|_| bad())?;
            let dy: i32 = dy.trim().parse().map_err(|_| bad())?;
            if dx == 0 && dy == 0 {
                return Err(bad());
            }
            spec.owner = Some(lookup(n, owner.trim())?);
            spec.owner_offset = (dx, dy);
        }
        if let Some(v) = attrs.get("building") {
            let dims = v
                .split_once('x')
                .and_then(|(w, h)| Some((w.parse::<usize>().ok()?, h.parse::<usize>().ok()?)));
            let Some((w, h)) = dims.filter(|&(w, h)| w > 0 && h > 0) else {
                return Err(CatalogError::BadValue {
                    tile: n,
                    key: "building".into(),
                    value: v.clone(),
                });
            };
            let bi = BuildingInfo::from_center(n, w, h);
            let lead = usize::from(w >= 3) + if h >= 3 { w } else { 0 };
            if (n as usize) < lead || bi.members.iter().any(|&m| m as usize >= count) {
                return Err(CatalogError::BadBuilding { tile: n });
            }
            spec.building = Some(bi);
        }
        specs.push(spec);
    }

    // Members without an explicit owner belong to the building that lists them.
    let buildings: Vec<(u16, BuildingInfo)> = specs
        .iter()
        .filter_map(|s| s.building.clone().map(|b| (s.number, b)))
        .collect();
    for (center, bi) in buildings {
        for (i, &m) in bi.members.iter().enumerate() {
            let offset = bi.member_offset(i);
            let member = &mut specs[m as usize];
            if member.owner.is_none() && offset != (0, 0) {
                member.owner = Some(center);
                member.owner_offset = offset;
            }
        }
    }

    Ok(TileCatalog::from_specs(specs))
}

/// First bare word of a tile line, used as its symbolic name.
fn tokens_label(rest: &str) -> Option<String> {
    let word = rest.split_whitespace().next()?;
    if word.starts_with('(') || word.starts_with('|') {
        return None;
    }
    Some(word.trim_matches('"').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# attribute macros
zone-part (conducts)
water (noburn) (description=#2)

0 dirt (noburn) (description=#1)
1 river (water)
2 fire1 (behavior=FIRE) (becomes=fire2) (noburn)
3 fire2 (behavior=FIRE) (becomes=fire1) (noburn)
4 lot-nw (zone-part)
5 lot-n (zone-part)
6 lot-ne (zone-part)
7 lot-w (zone-part)
8 lot-center (zone-part) (zone) (building=3x3) (behavior=RESIDENTIAL) (pollution=7)
9 lot-e (zone-part)
10 lot-sw (zone-part)
11 lot-s (zone-part)
12 lot-se (zone-part) | img12.png
13 wire (bulldozable) (conducts) (building-part=lot-center,1,2)
"#;

    #[test]
    fn test_parse_sample() {
        let cat = TileCatalog::parse(SAMPLE).unwrap();
        assert_eq!(cat.len(), 14);
        assert!(!cat.is_combustible(0));
        assert!(!cat.is_combustible(1));
        assert_eq!(cat.description(1), 2);
        assert_eq!(cat.get(2).and_then(|t| t.anim_next), Some(3));
        assert_eq!(cat.behavior(2), Some(TileBehavior::Fire));
        assert!(cat.is_zone_center(8));
        assert!(cat.is_conductive(4));
        assert_eq!(cat.zone_size(8), Some((3, 3)));
    }

    #[test]
    fn test_parse_assigns_member_owners() {
        let cat = TileCatalog::parse(SAMPLE).unwrap();
        assert_eq!(cat.owner(4), Some((8, (-1, -1))));
        assert_eq!(cat.owner(12), Some((8, (1, 1))));
        assert_eq!(cat.owner(8), None);
        assert_eq!(cat.pollution(4), 7);
    }

    #[test]
    fn test_explicit_building_part_wins() {
        let cat = TileCatalog::parse(SAMPLE).unwrap();
        assert_eq!(cat.owner(13), Some((8, (1, 2))));
    }

    #[test]
    fn test_unknown_behavior_is_an_error() {
        let err = TileCatalog::parse("0 dirt (behavior=DANCE)").unwrap_err();
        assert!(matches!(err, CatalogError::UnknownBehavior { tile: 0, .. }));
    }

    #[test]
    fn test_unknown_reference_is_an_error() {
        let err = TileCatalog::parse("0 dirt (becomes=nowhere)").unwrap_err();
        assert!(matches!(err, CatalogError::UnknownReference { tile: 0, .. }));
    }

    #[test]
    fn test_gap_in_tile_numbers() {
        let err = TileCatalog::parse("0 dirt\n2 river").unwrap_err();
        assert_eq!(err, CatalogError::MissingTile(1));
    }

    #[test]
    fn test_zero_building_part_offset_rejected() {
        let err = TileCatalog::parse("0 a\n1 b (building-part=a,0,0)").unwrap_err();
        assert!(matches!(err, CatalogError::BadValue { tile: 1, .. }));
    }

    #[test]
    fn test_mutually_recursive_macros_terminate() {
        let cat = TileCatalog::parse("a (b) (conducts)\nb (a)\n0 x (a)").unwrap();
        assert!(cat.is_conductive(0));
    }

    #[test]
    fn test_unclosed_attribute() {
        let err = TileCatalog::parse("0 dirt (noburn").unwrap_err();
        assert!(matches!(err, CatalogError::Syntax { line: 1, .. }));
    }
}
