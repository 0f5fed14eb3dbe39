//! Augmented diff parsing.
//!
//! The whole document is read into memory and turned into [`Action`]s in
//! document order. Only `action` elements directly under the root are
//! considered; other root children (`note`, `meta`, `remark`) are skipped.

use std::str::FromStr;

use geo::{Coord, Rect};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

use roadchanges_core::{
    Action, ChangeType, ElementKind, ObjectBody, ObjectHeader, ObjectSnapshot, RelationMember,
    Tags, WayNode,
};

/// Errors raised while parsing an augmented diff.
///
/// Positions are byte offsets into the document, just past the tag being
/// processed.
#[derive(Debug, Error)]
pub enum AdiffError {
    /// The markup is not well-formed.
    #[error("malformed XML at byte {position}: {source}")]
    Xml {
        /// Reader position when the error surfaced.
        position: u64,
        /// Underlying reader error.
        #[source]
        source: quick_xml::Error,
    },
    /// The document ended while elements were still open.
    #[error("unexpected end of document at byte {position}")]
    UnexpectedEof {
        /// Length of the consumed input.
        position: u64,
    },
    /// An `action` element has a `type` other than create/modify/delete.
    #[error("unknown action type '{value}' at byte {position}")]
    UnknownActionType {
        /// The offending `type` value.
        value: String,
        /// Position of the `action` tag.
        position: u64,
    },
    /// An action lacks the snapshot its type requires.
    #[error("{change_type} action ending at byte {position} has no {side} snapshot")]
    MissingSnapshot {
        /// Type of the incomplete action.
        change_type: ChangeType,
        /// Missing side, `old` or `new`.
        side: &'static str,
        /// Position of the end of the action.
        position: u64,
    },
    /// An object element is not a node, way or relation.
    #[error("unknown object element <{name}> at byte {position}")]
    UnknownObjectKind {
        /// Element name as written.
        name: String,
        /// Position of the element.
        position: u64,
    },
    /// A required attribute is absent.
    #[error("<{element}> at byte {position} lacks the '{attribute}' attribute")]
    MissingAttribute {
        /// Element carrying the attribute.
        element: &'static str,
        /// Attribute name.
        attribute: &'static str,
        /// Position of the element.
        position: u64,
    },
    /// An attribute value could not be parsed.
    #[error("<{element}> at byte {position} has invalid {attribute}=\"{value}\"")]
    InvalidAttribute {
        /// Element carrying the attribute.
        element: &'static str,
        /// Attribute name.
        attribute: &'static str,
        /// Raw attribute value.
        value: String,
        /// Position of the element.
        position: u64,
    },
}

/// Parse an augmented diff document into actions, in document order.
///
/// # Errors
///
/// Returns [`AdiffError`] for malformed markup, an unknown action type, a
/// missing `old`/`new` snapshot, an object element of unknown kind or an
/// unparsable attribute.
///
/// # Examples
/// ```
/// use roadchanges_core::ChangeType;
/// use roadchanges_data::parse_adiff;
///
/// # fn main() -> Result<(), roadchanges_data::AdiffError> {
/// let actions = parse_adiff(
///     r#"<osm><action type="create"><node id="1" lat="20" lon="10"/></action></osm>"#,
/// )?;
/// assert_eq!(actions.len(), 1);
/// assert_eq!(actions[0].change_type(), ChangeType::Create);
/// # Ok(())
/// # }
/// ```
pub fn parse_adiff(text: &str) -> Result<Vec<Action>, AdiffError> {
    AdiffReader::new(text).document()
}

struct AdiffReader<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> AdiffReader<'a> {
    fn new(text: &'a str) -> Self {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);
        Self { reader }
    }

    fn position(&self) -> u64 {
        self.reader.buffer_position()
    }

    fn xml_error(&self, source: quick_xml::Error) -> AdiffError {
        AdiffError::Xml {
            position: self.position(),
            source,
        }
    }

    fn eof(&self) -> AdiffError {
        AdiffError::UnexpectedEof {
            position: self.position(),
        }
    }

    fn next_event(&mut self) -> Result<Event<'a>, AdiffError> {
        self.reader
            .read_event()
            .map_err(|source| self.xml_error(source))
    }

    fn document(mut self) -> Result<Vec<Action>, AdiffError> {
        loop {
            match self.next_event()? {
                Event::Start(_) => break,
                Event::Empty(_) => return Ok(Vec::new()),
                Event::Eof => return Err(self.eof()),
                _ => {}
            }
        }

        let mut actions = Vec::new();
        loop {
            match self.next_event()? {
                Event::Start(element) if element.name().as_ref() == b"action" => {
                    actions.push(self.action(&element)?);
                }
                Event::Empty(element) if element.name().as_ref() == b"action" => {
                    return Err(AdiffError::MissingSnapshot {
                        change_type: self.change_type(&element)?,
                        side: "new",
                        position: self.position(),
                    });
                }
                Event::Start(_) => self.skip()?,
                Event::End(_) => return Ok(actions),
                Event::Eof => return Err(self.eof()),
                _ => {}
            }
        }
    }

    /// Consume events up to the end tag matching an already-read start tag.
    fn skip(&mut self) -> Result<(), AdiffError> {
        let mut depth = 1_usize;
        while depth > 0 {
            match self.next_event()? {
                Event::Start(_) => depth = depth.saturating_add(1),
                Event::End(_) => depth = depth.saturating_sub(1),
                Event::Eof => return Err(self.eof()),
                _ => {}
            }
        }
        Ok(())
    }

    fn change_type(&self, start: &BytesStart<'_>) -> Result<ChangeType, AdiffError> {
        let value: String = self.required(start, "action", "type")?;
        match value.parse() {
            Ok(change_type) => Ok(change_type),
            Err(_) => Err(AdiffError::UnknownActionType {
                value,
                position: self.position(),
            }),
        }
    }

    fn action(&mut self, start: &BytesStart<'_>) -> Result<Action, AdiffError> {
        let change_type = self.change_type(start)?;
        let mut old = None;
        let mut new = None;
        loop {
            match self.next_event()? {
                Event::Start(element) => match element.name().as_ref() {
                    b"old" => old = old.or(self.wrapped_snapshot()?),
                    b"new" => new = new.or(self.wrapped_snapshot()?),
                    _ => {
                        let snapshot = self.object(&element, true)?;
                        new.get_or_insert(snapshot);
                    }
                },
                Event::Empty(element) => match element.name().as_ref() {
                    b"old" | b"new" => {}
                    _ => {
                        let snapshot = self.object(&element, false)?;
                        new.get_or_insert(snapshot);
                    }
                },
                Event::End(_) => break,
                Event::Eof => return Err(self.eof()),
                _ => {}
            }
        }

        let position = self.position();
        let missing = |side: &'static str| AdiffError::MissingSnapshot {
            change_type,
            side,
            position,
        };
        let current = new.ok_or_else(|| missing("new"))?;
        match change_type {
            ChangeType::Create => Ok(Action::create(current)),
            ChangeType::Modify => Ok(Action::modify(old.ok_or_else(|| missing("old"))?, current)),
            ChangeType::Delete => Ok(Action::delete(old.ok_or_else(|| missing("old"))?, current)),
        }
    }

    /// Read the first object inside an `old`/`new` wrapper.
    fn wrapped_snapshot(&mut self) -> Result<Option<ObjectSnapshot>, AdiffError> {
        let mut snapshot = None;
        loop {
            let parsed = match self.next_event()? {
                Event::Start(element) => self.object(&element, true)?,
                Event::Empty(element) => self.object(&element, false)?,
                Event::End(_) => return Ok(snapshot),
                Event::Eof => return Err(self.eof()),
                _ => continue,
            };
            snapshot.get_or_insert(parsed);
        }
    }

    fn object(
        &mut self,
        start: &BytesStart<'_>,
        has_children: bool,
    ) -> Result<ObjectSnapshot, AdiffError> {
        let kind = match start.name().as_ref() {
            b"node" => ElementKind::Node,
            b"way" => ElementKind::Way,
            b"relation" => ElementKind::Relation,
            other => {
                return Err(AdiffError::UnknownObjectKind {
                    name: String::from_utf8_lossy(other).into_owned(),
                    position: self.position(),
                });
            }
        };
        let element = kind.as_str();
        let header = ObjectHeader {
            id: self.required(start, element, "id")?,
            version: self.optional(start, element, "version")?,
            changeset: self.optional(start, element, "changeset")?,
            uid: self.optional(start, element, "uid")?,
            user: self.optional(start, element, "user")?,
            timestamp: self.optional(start, element, "timestamp")?,
        };
        let mut body = match kind {
            ElementKind::Node => ObjectBody::Node {
                lon: self.optional(start, element, "lon")?,
                lat: self.optional(start, element, "lat")?,
            },
            ElementKind::Way => ObjectBody::Way { nodes: Vec::new() },
            ElementKind::Relation => ObjectBody::Relation {
                members: Vec::new(),
            },
        };
        let mut tags = Tags::new();
        let mut bounds = None;

        while has_children {
            let (child, nested) = match self.next_event()? {
                Event::Start(child) => (child, true),
                Event::Empty(child) => (child, false),
                Event::End(_) => break,
                Event::Eof => return Err(self.eof()),
                _ => continue,
            };
            match (child.name().as_ref(), &mut body) {
                (b"tag", _) => {
                    let key: String = self.required(&child, "tag", "k")?;
                    let value: String = self.required(&child, "tag", "v")?;
                    tags.push(key, value);
                }
                (b"nd", ObjectBody::Way { nodes }) => nodes.push(self.way_node(&child)?),
                (b"member", ObjectBody::Relation { members }) => {
                    members.push(self.member(&child)?);
                }
                (b"bounds", _) => bounds = Some(self.bounds(&child)?),
                _ => {}
            }
            if nested {
                self.skip()?;
            }
        }

        Ok(ObjectSnapshot {
            header,
            tags,
            bounds,
            body,
        })
    }

    fn way_node(&self, start: &BytesStart<'_>) -> Result<WayNode, AdiffError> {
        let lon: Option<f64> = self.optional(start, "nd", "lon")?;
        let lat: Option<f64> = self.optional(start, "nd", "lat")?;
        Ok(WayNode {
            node_ref: self.required(start, "nd", "ref")?,
            location: lon.zip(lat).map(|(x, y)| Coord { x, y }),
        })
    }

    fn member(&self, start: &BytesStart<'_>) -> Result<RelationMember, AdiffError> {
        Ok(RelationMember {
            kind: self.required(start, "member", "type")?,
            member_ref: self.required(start, "member", "ref")?,
            role: self.optional(start, "member", "role")?.unwrap_or_default(),
        })
    }

    fn bounds(&self, start: &BytesStart<'_>) -> Result<Rect<f64>, AdiffError> {
        let min = Coord {
            x: self.required(start, "bounds", "minlon")?,
            y: self.required(start, "bounds", "minlat")?,
        };
        let max = Coord {
            x: self.required(start, "bounds", "maxlon")?,
            y: self.required(start, "bounds", "maxlat")?,
        };
        Ok(Rect::new(min, max))
    }

    fn required<T: FromStr>(
        &self,
        start: &BytesStart<'_>,
        element: &'static str,
        attribute: &'static str,
    ) -> Result<T, AdiffError> {
        self.optional(start, element, attribute)?
            .ok_or_else(|| AdiffError::MissingAttribute {
                element,
                attribute,
                position: self.position(),
            })
    }

    fn optional<T: FromStr>(
        &self,
        start: &BytesStart<'_>,
        element: &'static str,
        attribute: &'static str,
    ) -> Result<Option<T>, AdiffError> {
        let Some(value) = self.attribute(start, attribute)? else {
            return Ok(None);
        };
        match value.parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(AdiffError::InvalidAttribute {
                element,
                attribute,
                value,
                position: self.position(),
            }),
        }
    }

    fn attribute(&self, start: &BytesStart<'_>, key: &str) -> Result<Option<String>, AdiffError> {
        for entry in start.attributes() {
            let attribute = entry.map_err(|err| self.xml_error(err.into()))?;
            if attribute.key.as_ref() == key.as_bytes() {
                let value = attribute
                    .unescape_value()
                    .map_err(|err| self.xml_error(err))?;
                return Ok(Some(value.into_owned()));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const MODIFY_WAY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="Overpass API">
  <note>The data included in this document is from www.openstreetmap.org.</note>
  <meta osm_base="2024-05-01T12:00:00Z"/>
  <action type="modify">
    <old>
      <way id="42" version="3" timestamp="2024-04-01T08:00:00Z" changeset="90" uid="4" user="old">
        <bounds minlat="52.0" minlon="13.0" maxlat="52.1" maxlon="13.2"/>
        <nd ref="1" lat="52.0" lon="13.0"/>
        <nd ref="2" lat="52.1" lon="13.2"/>
        <tag k="maxspeed" v="50"/>
      </way>
    </old>
    <new>
      <way id="42" version="4" timestamp="2024-05-01T12:00:00Z" changeset="100" uid="5" user="new &amp; improved">
        <bounds minlat="52.0" minlon="13.0" maxlat="52.1" maxlon="13.2"/>
        <nd ref="1" lat="52.0" lon="13.0"/>
        <nd ref="2"/>
        <tag k="maxspeed:forward" v="60"/>
        <tag k="maxspeed:backward" v="50"/>
      </way>
    </new>
  </action>
</osm>"#;

    fn wrap(body: &str) -> String {
        format!("<osmAugmentedDiff>{body}</osmAugmentedDiff>")
    }

    #[rstest]
    fn parses_paired_way_snapshots() {
        let actions = parse_adiff(MODIFY_WAY).expect("valid diff");
        assert_eq!(actions.len(), 1);
        let action = actions.first().expect("one action");
        assert_eq!(action.change_type(), ChangeType::Modify);

        let old = action.old_snapshot().expect("old side");
        assert_eq!(old.header.version, Some(3));
        assert_eq!(old.tag("maxspeed"), Some("50"));

        let new = action.new_snapshot();
        assert_eq!(new.osm_id(), "way/42");
        assert_eq!(new.header.user.as_deref(), Some("new & improved"));
        assert_eq!(new.header.changeset, Some(100));
        assert_eq!(new.tags.len(), 2);
        let nodes = new.way_nodes();
        assert_eq!(nodes.len(), 2);
        assert_eq!(
            nodes.first().and_then(|node| node.location),
            Some(Coord { x: 13.0, y: 52.0 })
        );
        assert_eq!(nodes.get(1).and_then(|node| node.location), None);
        let bounds = new.bounds.expect("bounds");
        assert_eq!(bounds.min(), Coord { x: 13.0, y: 52.0 });
        assert_eq!(bounds.max(), Coord { x: 13.2, y: 52.1 });
    }

    #[rstest]
    fn create_holds_the_object_directly() {
        let text = wrap(
            r#"<action type="create"><node id="7" version="1" lat="20.5" lon="10.25"><tag k="highway" v="bus_stop"/></node></action>"#,
        );
        let actions = parse_adiff(&text).expect("valid diff");
        let action = actions.first().expect("one action");
        assert_eq!(action.change_type(), ChangeType::Create);
        assert!(action.old_snapshot().is_none());
        assert_eq!(
            action.new_snapshot().body,
            ObjectBody::Node {
                lon: Some(10.25),
                lat: Some(20.5)
            }
        );
    }

    #[rstest]
    fn sparse_old_nodes_keep_missing_coordinates() {
        let text = wrap(
            r#"<action type="delete"><old><node id="3" version="2"/></old><new><node id="3" version="3" lat="1" lon="2" visible="false"/></new></action>"#,
        );
        let actions = parse_adiff(&text).expect("valid diff");
        let old = actions
            .first()
            .and_then(Action::old_snapshot)
            .expect("old side");
        assert_eq!(old.body, ObjectBody::Node { lon: None, lat: None });
    }

    #[rstest]
    fn relation_members_are_read() {
        let text = wrap(
            r#"<action type="create"><relation id="5"><member type="way" ref="8" role="outer"/><member type="node" ref="9"/></relation></action>"#,
        );
        let actions = parse_adiff(&text).expect("valid diff");
        let members = actions
            .first()
            .map(|action| action.new_snapshot().relation_members().to_vec())
            .expect("one action");
        assert_eq!(
            members,
            vec![
                RelationMember {
                    kind: ElementKind::Way,
                    member_ref: 8,
                    role: "outer".to_owned(),
                },
                RelationMember {
                    kind: ElementKind::Node,
                    member_ref: 9,
                    role: String::new(),
                },
            ]
        );
    }

    #[rstest]
    fn non_action_children_are_ignored() {
        let text = wrap(r#"<remark>runtime error</remark><note/><meta><x/></meta>"#);
        assert!(parse_adiff(&text).expect("valid diff").is_empty());
    }

    #[rstest]
    fn nested_actions_are_not_collected() {
        let text = wrap(
            r#"<group><action type="create"><node id="1" lat="0" lon="0"/></action></group>"#,
        );
        assert!(parse_adiff(&text).expect("valid diff").is_empty());
    }

    #[rstest]
    #[case::unknown_type(
        r#"<action type="upsert"><node id="1"/></action>"#,
        "unknown action type 'upsert'"
    )]
    #[case::missing_old(
        r#"<action type="modify"><new><node id="1"/></new></action>"#,
        "no old snapshot"
    )]
    #[case::empty_action(r#"<action type="create"/>"#, "no new snapshot")]
    #[case::unknown_kind(r#"<action type="create"><area id="1"/></action>"#, "<area>")]
    #[case::missing_id(r#"<action type="create"><node lat="1"/></action>"#, "'id'")]
    #[case::bad_number(
        r#"<action type="create"><node id="x1"/></action>"#,
        "invalid id=\"x1\""
    )]
    #[case::bad_member(
        r#"<action type="create"><relation id="1"><member type="area" ref="2"/></relation></action>"#,
        "invalid type=\"area\""
    )]
    fn rejects_malformed_actions(#[case] body: &str, #[case] fragment: &str) {
        let err = parse_adiff(&wrap(body)).expect_err("malformed diff");
        let message = err.to_string();
        assert!(message.contains(fragment), "got {message}");
    }

    #[rstest]
    fn unbalanced_markup_is_fatal() {
        let err = parse_adiff("<osm><action type=\"create\"><node id=\"1\"></way></action></osm>")
            .expect_err("mismatched end tag");
        assert!(matches!(err, AdiffError::Xml { .. }), "got {err:?}");
    }

    #[rstest]
    fn truncated_documents_are_fatal() {
        let err = parse_adiff("<osm><action type=\"create\"><node id=\"1\">")
            .expect_err("truncated");
        assert!(
            matches!(err, AdiffError::UnexpectedEof { .. } | AdiffError::Xml { .. }),
            "got {err:?}"
        );
    }
}
