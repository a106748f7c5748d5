// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The raw interchange format: a flat, camelCase JSON rendition of a
//! document.
//!
//! Range offsets and lengths are UTF-16 code units, matching the
//! in-memory model, so a JavaScript consumer can slice block text
//! directly. Styles are encoded as per-style ranges (overlapping
//! styles yield overlapping ranges); entities as non-overlapping
//! ranges into `entityMap`. Deserializing validates everything —
//! malformed input surfaces as [`RawDocumentError`], never a panic.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::block::{BlockKey, BlockType, ContentBlock, TextBlock};
use crate::char_meta::CharacterMetadata;
use crate::document::DocumentState;
use crate::entity::{
    EntityData, EntityInstance, EntityKey, EntityMutability, EntityTable,
};
use crate::error::RawDocumentError;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawDocument {
    pub blocks: Vec<RawBlock>,
    pub entity_map: BTreeMap<String, RawEntity>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    pub key: String,
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: String,
    #[serde(default)]
    pub depth: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inline_style_ranges: Vec<RawStyleRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_ranges: Vec<RawEntityRange>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawStyleRange {
    pub offset: usize,
    pub length: usize,
    pub style: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawEntityRange {
    pub offset: usize,
    pub length: usize,
    pub key: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawEntity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub mutability: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: EntityData,
}

/// Render a document into the raw format. Only entities some character
/// actually references end up in `entityMap`.
pub fn to_raw<B: TextBlock>(state: &DocumentState<B>) -> RawDocument {
    let mut referenced: BTreeSet<EntityKey> = BTreeSet::new();
    let blocks = state
        .block_map()
        .iter()
        .map(|block| {
            let mut style_ranges = Vec::new();
            let used: BTreeSet<&String> = block
                .chars()
                .iter()
                .flat_map(|meta| meta.styles())
                .collect();
            for style in used {
                block.find_style_ranges(
                    |styles| styles.contains(style.as_str()),
                    |start, end| {
                        style_ranges.push(RawStyleRange {
                            offset: start,
                            length: end - start,
                            style: (*style).clone(),
                        });
                    },
                );
            }
            style_ranges.sort_by_key(|r| (r.offset, r.style.clone()));

            let mut entity_ranges = Vec::new();
            block.find_entity_ranges(
                |entity| entity.is_some(),
                |start, end| {
                    let key =
                        block.entity_at(start).expect("filtered on presence");
                    referenced.insert(key);
                    entity_ranges.push(RawEntityRange {
                        offset: start,
                        length: end - start,
                        key: key.value(),
                    });
                },
            );

            RawBlock {
                key: block.key().to_string(),
                block_type: block.block_type().to_string(),
                text: block.text().to_string(),
                depth: block.depth(),
                inline_style_ranges: style_ranges,
                entity_ranges,
                data: block.data().clone(),
            }
        })
        .collect();

    let entity_map = referenced
        .into_iter()
        .map(|key| {
            let instance = state.entity(key);
            (
                key.to_string(),
                RawEntity {
                    entity_type: instance.entity_type().to_owned(),
                    mutability: instance.mutability().to_string(),
                    data: instance.data().clone(),
                },
            )
        })
        .collect();

    RawDocument {
        blocks,
        entity_map,
    }
}

/// Rebuild a document from the raw format, validating block types,
/// mutabilities, range bounds and entity references.
pub fn from_raw(
    raw: &RawDocument,
) -> Result<DocumentState<ContentBlock>, RawDocumentError> {
    if raw.blocks.is_empty() {
        return Err(RawDocumentError::EmptyDocument);
    }

    let mut table = EntityTable::new();
    let mut key_map: BTreeMap<&str, EntityKey> = BTreeMap::new();
    for (raw_key, raw_entity) in &raw.entity_map {
        let mutability =
            EntityMutability::from_str(&raw_entity.mutability).map_err(
                |_| {
                    RawDocumentError::UnknownMutability(
                        raw_entity.mutability.clone(),
                    )
                },
            )?;
        let (bigger, key) = table.create(EntityInstance::new(
            &raw_entity.entity_type,
            mutability,
            raw_entity.data.clone(),
        ));
        table = bigger;
        key_map.insert(raw_key, key);
    }

    let mut seen_keys = BTreeSet::new();
    let mut blocks = Vec::with_capacity(raw.blocks.len());
    for raw_block in &raw.blocks {
        if !seen_keys.insert(&raw_block.key) {
            return Err(RawDocumentError::DuplicateBlockKey(
                raw_block.key.clone(),
            ));
        }
        let block_type =
            BlockType::from_str(&raw_block.block_type).map_err(|_| {
                RawDocumentError::UnknownBlockType(
                    raw_block.block_type.clone(),
                )
            })?;

        let text = widestring::Utf16String::from_str(&raw_block.text);
        let len = text.len();
        let mut chars = vec![CharacterMetadata::new(); len];

        for range in &raw_block.inline_style_ranges {
            let out_of_bounds = range
                .offset
                .checked_add(range.length)
                .is_none_or(|end| end > len);
            if out_of_bounds {
                return Err(RawDocumentError::StyleRangeOutOfBounds {
                    block: raw_block.key.clone(),
                    offset: range.offset,
                    length: range.length,
                    len,
                });
            }
            for meta in &mut chars[range.offset..range.offset + range.length]
            {
                *meta = meta.apply_style(&range.style);
            }
        }

        for range in &raw_block.entity_ranges {
            let out_of_bounds = range
                .offset
                .checked_add(range.length)
                .is_none_or(|end| end > len);
            if out_of_bounds {
                return Err(RawDocumentError::EntityRangeOutOfBounds {
                    block: raw_block.key.clone(),
                    offset: range.offset,
                    length: range.length,
                    len,
                });
            }
            let key = key_map
                .get(range.key.to_string().as_str())
                .copied()
                .ok_or(RawDocumentError::UnknownEntityKey {
                    block: raw_block.key.clone(),
                    key: range.key,
                })?;
            for meta in &mut chars[range.offset..range.offset + range.length]
            {
                *meta = meta.set_entity(Some(key));
            }
        }

        blocks.push(ContentBlock::new_block(
            BlockKey::from(raw_block.key.as_str()),
            block_type,
            raw_block.depth,
            raw_block.data.clone(),
            text,
            chars,
        ));
    }

    Ok(DocumentState::from_parts(blocks, table))
}

/// Serialize a document to canonical JSON.
pub fn to_json<B: TextBlock>(
    state: &DocumentState<B>,
) -> Result<String, RawDocumentError> {
    Ok(serde_json::to_string(&to_raw(state))?)
}

/// Parse and validate a document from JSON.
pub fn from_json(
    json: &str,
) -> Result<DocumentState<ContentBlock>, RawDocumentError> {
    let raw: RawDocument = serde_json::from_str(json)?;
    from_raw(&raw)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        from_json, from_raw, to_json, to_raw, RawBlock, RawDocument,
        RawEntityRange, RawStyleRange,
    };
    use crate::block::{BlockType, TextBlock};
    use crate::char_meta::inline_style::{BOLD, ITALIC};
    use crate::document::DocumentState;
    use crate::entity::{EntityData, EntityInstance, EntityMutability};
    use crate::error::RawDocumentError;
    use crate::modifier::{
        apply_entity, apply_inline_style, set_block_type,
    };
    use crate::selection::SelectionState;

    fn styled_doc() -> DocumentState<crate::block::ContentBlock> {
        let doc = DocumentState::from_text("hello world\nsecond");
        let key = doc.block_map().first().unwrap().key().clone();
        let doc = apply_inline_style(
            &doc,
            &SelectionState::range_in(key.clone(), 0, 5),
            BOLD,
        );
        let doc = apply_inline_style(
            &doc,
            &SelectionState::range_in(key.clone(), 3, 8),
            ITALIC,
        );
        let mut data = EntityData::new();
        data.insert("url".to_owned(), json!("https://example.org"));
        let (doc, entity) = doc.create_entity(EntityInstance::new(
            "LINK",
            EntityMutability::Mutable,
            data,
        ));
        apply_entity(
            &doc,
            &SelectionState::range_in(key, 6, 11),
            Some(entity),
        )
    }

    #[test]
    fn raw_blocks_carry_per_style_ranges() {
        let raw = to_raw(&styled_doc());
        let ranges = &raw.blocks[0].inline_style_ranges;
        assert!(ranges.contains(&RawStyleRange {
            offset: 0,
            length: 5,
            style: BOLD.to_owned(),
        }));
        assert!(ranges.contains(&RawStyleRange {
            offset: 3,
            length: 5,
            style: ITALIC.to_owned(),
        }));
    }

    #[test]
    fn raw_entity_ranges_point_into_the_entity_map() {
        let raw = to_raw(&styled_doc());
        let ranges = &raw.blocks[0].entity_ranges;
        assert_eq!(ranges.len(), 1);
        let range = &ranges[0];
        assert_eq!((range.offset, range.length), (6, 5));
        let entity = &raw.entity_map[&range.key.to_string()];
        assert_eq!(entity.entity_type, "LINK");
        assert_eq!(entity.mutability, "MUTABLE");
    }

    #[test]
    fn unreferenced_entities_are_dropped_from_the_map() {
        let doc = DocumentState::from_text("plain");
        let (doc, _unused) = doc.create_entity(EntityInstance::new(
            "LINK",
            EntityMutability::Mutable,
            EntityData::new(),
        ));
        assert!(to_raw(&doc).entity_map.is_empty());
    }

    #[test]
    fn json_uses_camel_case_field_names() {
        let json = to_json(&styled_doc()).unwrap();
        assert!(json.contains("\"inlineStyleRanges\""));
        assert!(json.contains("\"entityRanges\""));
        assert!(json.contains("\"entityMap\""));
        assert!(json.contains("\"type\""));
        assert!(!json.contains("\"block_type\""));
    }

    #[test]
    fn documents_round_trip_through_json() {
        let doc = styled_doc();
        let doc = set_block_type(
            &doc,
            doc.selection_after(),
            BlockType::HeaderTwo,
        );
        let rebuilt = from_json(&to_json(&doc).unwrap()).unwrap();

        assert_eq!(rebuilt.plain_text(), doc.plain_text());
        for (a, b) in
            doc.block_map().iter().zip(rebuilt.block_map().iter())
        {
            assert_eq!(a.key(), b.key());
            assert_eq!(a.block_type(), b.block_type());
            assert_eq!(a.depth(), b.depth());
            assert_eq!(a.chars().iter().map(|c| c.styles().clone()).collect::<Vec<_>>(),
                       b.chars().iter().map(|c| c.styles().clone()).collect::<Vec<_>>());
        }
        // The entity survived with its data.
        let block = rebuilt.block_map().first().unwrap();
        let key = block.entity_at(6).unwrap();
        assert_eq!(
            rebuilt.entity(key).data()["url"],
            json!("https://example.org")
        );
    }

    #[test]
    fn offsets_are_utf16_code_units() {
        let doc = DocumentState::from_text("\u{1F4A9}x");
        let key = doc.block_map().first().unwrap().key().clone();
        // Style only the "x", which sits at code units 2..3.
        let doc = apply_inline_style(
            &doc,
            &SelectionState::range_in(key, 2, 3),
            BOLD,
        );
        let raw = to_raw(&doc);
        assert_eq!(raw.blocks[0].inline_style_ranges[0].offset, 2);
        assert_eq!(raw.blocks[0].inline_style_ranges[0].length, 1);

        let rebuilt = from_raw(&raw).unwrap();
        let block = rebuilt.block_map().first().unwrap();
        assert!(block.char_at(2).unwrap().has_style(BOLD));
        assert!(!block.char_at(1).unwrap().has_style(BOLD));
    }

    fn bare_block(key: &str, text: &str) -> RawBlock {
        RawBlock {
            key: key.to_owned(),
            block_type: "unstyled".to_owned(),
            text: text.to_owned(),
            depth: 0,
            inline_style_ranges: Vec::new(),
            entity_ranges: Vec::new(),
            data: Default::default(),
        }
    }

    #[test]
    fn an_empty_block_list_is_rejected() {
        let raw = RawDocument {
            blocks: Vec::new(),
            entity_map: Default::default(),
        };
        assert!(matches!(
            from_raw(&raw),
            Err(RawDocumentError::EmptyDocument)
        ));
    }

    #[test]
    fn duplicate_block_keys_are_rejected() {
        let raw = RawDocument {
            blocks: vec![bare_block("a", "one"), bare_block("a", "two")],
            entity_map: Default::default(),
        };
        assert!(matches!(
            from_raw(&raw),
            Err(RawDocumentError::DuplicateBlockKey(_))
        ));
    }

    #[test]
    fn an_unknown_block_type_is_rejected() {
        let mut block = bare_block("a", "text");
        block.block_type = "marquee".to_owned();
        let raw = RawDocument {
            blocks: vec![block],
            entity_map: Default::default(),
        };
        assert!(matches!(
            from_raw(&raw),
            Err(RawDocumentError::UnknownBlockType(t)) if t == "marquee"
        ));
    }

    #[test]
    fn an_out_of_bounds_style_range_is_rejected() {
        let mut block = bare_block("a", "ab");
        block.inline_style_ranges.push(RawStyleRange {
            offset: 1,
            length: 5,
            style: BOLD.to_owned(),
        });
        let raw = RawDocument {
            blocks: vec![block],
            entity_map: Default::default(),
        };
        assert!(matches!(
            from_raw(&raw),
            Err(RawDocumentError::StyleRangeOutOfBounds { .. })
        ));
    }

    #[test]
    fn an_unresolved_entity_range_is_rejected() {
        let mut block = bare_block("a", "ab");
        block.entity_ranges.push(RawEntityRange {
            offset: 0,
            length: 2,
            key: 7,
        });
        let raw = RawDocument {
            blocks: vec![block],
            entity_map: Default::default(),
        };
        assert!(matches!(
            from_raw(&raw),
            Err(RawDocumentError::UnknownEntityKey { key: 7, .. })
        ));
    }

    #[test]
    fn an_unknown_mutability_is_rejected() {
        let json = r#"{
            "blocks": [
                {"key": "a", "type": "unstyled", "text": "x", "depth": 0}
            ],
            "entityMap": {
                "0": {"type": "LINK", "mutability": "FLEXIBLE"}
            }
        }"#;
        assert!(matches!(
            from_json(json),
            Err(RawDocumentError::UnknownMutability(m)) if m == "FLEXIBLE"
        ));
    }

    #[test]
    fn malformed_json_is_reported_not_panicked() {
        assert!(matches!(
            from_json("{not json"),
            Err(RawDocumentError::Json(_))
        ));
    }
}
