use std::collections::HashSet;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::limits::MAX_INVENTORY_ROOMS;
use crate::loader::DataLoadError;
use crate::model::{Room, RoomRef};

/// Immutable room inventory for a session.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    rooms: Vec<Room>,
}

/// One inventory row as it arrives from JSON or delimited text.
/// Keys are lower-cased before deserializing, so aliases cover case variants too.
#[derive(Debug, Deserialize)]
struct RoomRecord {
    #[serde(deserialize_with = "lenient_string")]
    block: String,
    #[serde(alias = "room_no", alias = "room", deserialize_with = "lenient_string")]
    id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    floor: String,
    #[serde(alias = "min_person", deserialize_with = "lenient_u32")]
    min_occupants: u32,
    #[serde(alias = "max_person", deserialize_with = "lenient_u32")]
    max_occupants: u32,
    #[serde(default, alias = "airconditioning", alias = "ac", deserialize_with = "lenient_bool")]
    has_ac: bool,
    #[serde(default, alias = "wheel_chair_access", alias = "wheelchair", deserialize_with = "lenient_bool")]
    wheelchair_accessible: bool,
    #[serde(default, alias = "pets", deserialize_with = "lenient_bool")]
    pets_permitted: bool,
    #[serde(default, alias = "group", deserialize_with = "lenient_bool")]
    group_booking_permitted: bool,
}

impl From<RoomRecord> for Room {
    fn from(r: RoomRecord) -> Self {
        Room {
            block: r.block,
            id: r.id,
            floor: r.floor,
            min_occupants: r.min_occupants,
            max_occupants: r.max_occupants,
            has_ac: r.has_ac,
            wheelchair_accessible: r.wheelchair_accessible,
            pets_permitted: r.pets_permitted,
            group_booking_permitted: r.group_booking_permitted,
        }
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!("expected text, got {other}"))),
    }
}

fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    match Value::deserialize(d)? {
        Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| serde::de::Error::custom(format!("expected a count, got {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("expected a count, got {s:?}"))),
        other => Err(serde::de::Error::custom(format!("expected a count, got {other}"))),
    }
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    match Value::deserialize(d)? {
        Value::Bool(b) => Ok(b),
        Value::Null => Ok(false),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|v| v != 0.0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Ok(true),
            "false" | "no" | "n" | "0" | "" => Ok(false),
            _ => Err(serde::de::Error::custom(format!("expected yes/no, got {s:?}"))),
        },
        other => Err(serde::de::Error::custom(format!("expected yes/no, got {other}"))),
    }
}

fn lowercase_keys(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v))
        .collect()
}

impl Inventory {
    /// Build from already-normalized rooms, rejecting impossible bounds and duplicates.
    pub fn new(rooms: Vec<Room>) -> Result<Self, DataLoadError> {
        if rooms.len() > MAX_INVENTORY_ROOMS {
            return Err(DataLoadError::Malformed(format!(
                "inventory has {} rooms, limit is {MAX_INVENTORY_ROOMS}",
                rooms.len()
            )));
        }
        let mut seen = HashSet::new();
        for room in &rooms {
            if room.block.is_empty() || room.id.is_empty() {
                return Err(DataLoadError::Malformed("room without block or number".into()));
            }
            if room.min_occupants < 1 || room.max_occupants < room.min_occupants {
                return Err(DataLoadError::Malformed(format!(
                    "room {} has occupancy {}..{}",
                    room.room_ref(),
                    room.min_occupants,
                    room.max_occupants
                )));
            }
            if !seen.insert(room.room_ref()) {
                return Err(DataLoadError::Malformed(format!("duplicate room {}", room.room_ref())));
            }
        }
        Ok(Self { rooms })
    }

    /// Parse a JSON array of room objects.
    pub fn from_json(text: &str) -> Result<Self, DataLoadError> {
        let rows: Vec<Map<String, Value>> =
            serde_json::from_str(text).map_err(|e| DataLoadError::Malformed(e.to_string()))?;
        Self::from_rows(rows)
    }

    /// Parse delimited text (comma, semicolon or tab) with a header row.
    pub fn from_delimited(text: &str) -> Result<Self, DataLoadError> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
        let header = lines
            .next()
            .ok_or_else(|| DataLoadError::Malformed("empty room table".into()))?;
        let delim = [',', ';', '\t']
            .into_iter()
            .max_by_key(|c| header.matches(*c).count())
            .unwrap_or(',');
        let columns: Vec<String> = split_row(header, delim);

        let mut rows = Vec::new();
        for (n, line) in lines.enumerate() {
            let cells = split_row(line, delim);
            if cells.len() != columns.len() {
                return Err(DataLoadError::Malformed(format!(
                    "row {} has {} cells, header has {}",
                    n + 2,
                    cells.len(),
                    columns.len()
                )));
            }
            let row: Map<String, Value> = columns
                .iter()
                .cloned()
                .zip(cells.into_iter().map(Value::String))
                .collect();
            rows.push(row);
        }
        Self::from_rows(rows)
    }

    fn from_rows(rows: Vec<Map<String, Value>>) -> Result<Self, DataLoadError> {
        let rooms = rows
            .into_iter()
            .map(|row| {
                serde_json::from_value::<RoomRecord>(Value::Object(lowercase_keys(row)))
                    .map(Room::from)
                    .map_err(|e| DataLoadError::Malformed(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(rooms)
    }

    pub fn all_rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn rooms_in_block<'a>(&'a self, block: &'a str) -> impl Iterator<Item = &'a Room> {
        self.rooms.iter().filter(move |r| r.block == block)
    }

    /// Distinct block names in first-seen order.
    pub fn blocks(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rooms
            .iter()
            .map(|r| r.block.as_str())
            .filter(|b| seen.insert(*b))
            .collect()
    }

    pub fn get(&self, room: &RoomRef) -> Option<&Room> {
        self.rooms.iter().find(|r| r.is(room))
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

/// Split one row on `delim`. Double-quoted cells may contain the delimiter; `""` is a literal quote.
fn split_row(line: &str, delim: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            c if c == delim && !quoted => cells.push(std::mem::take(&mut cell).trim().to_string()),
            c => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_with_source_field_names() {
        let inv = Inventory::from_json(
            r#"[
              {"block": "A", "room_no": "A-1", "floor": "1st", "min_person": 1, "max_person": 2,
               "airconditioning": false, "wheel_chair_access": true, "pets_permitted": false,
               "group_booking_permitted": true},
              {"Block": "D", "Room_No": "D-1", "FLOOR": "G", "MIN_PERSON": "1", "Max_Person": 2,
               "AirConditioning": "yes", "Wheel_Chair_Access": 1, "Pets_Permitted": "Y",
               "Group_Booking_Permitted": "no"}
            ]"#,
        )
        .unwrap();
        assert_eq!(inv.len(), 2);
        let d1 = inv.get(&RoomRef::new("D", "D-1")).unwrap();
        assert!(d1.has_ac);
        assert!(d1.wheelchair_accessible);
        assert!(d1.pets_permitted);
        assert!(!d1.group_booking_permitted);
        assert_eq!(d1.floor, "G");
    }

    #[test]
    fn delimited_text() {
        let inv = Inventory::from_delimited(
            "block,room_no,floor,min_person,max_person,airconditioning,wheel_chair_access,pets_permitted,group_booking_permitted\n\
             A,A-1,1st,1,2,false,true,false,true\n\
             \n\
             \"Old C\",C-1,G,2,3,true,false,false,true\n",
        )
        .unwrap();
        assert_eq!(inv.len(), 2);
        let c1 = inv.get(&RoomRef::new("Old C", "C-1")).unwrap();
        assert_eq!(c1.max_occupants, 3);
        assert!(c1.has_ac);
    }

    #[test]
    fn tab_delimited_detected() {
        let inv = Inventory::from_delimited("block\troom_no\tmin_person\tmax_person\nB\tB-1\t2\t4\n").unwrap();
        assert_eq!(inv.all_rooms()[0].id, "B-1");
        assert!(!inv.all_rooms()[0].has_ac);
    }

    #[test]
    fn impossible_occupancy_rejected() {
        let err = Inventory::from_json(r#"[{"block":"A","room_no":"A-1","min_person":3,"max_person":2}]"#)
            .unwrap_err();
        assert!(matches!(err, DataLoadError::Malformed(_)));
        let err = Inventory::from_json(r#"[{"block":"A","room_no":"A-1","min_person":0,"max_person":2}]"#)
            .unwrap_err();
        assert!(matches!(err, DataLoadError::Malformed(_)));
    }

    #[test]
    fn duplicate_room_rejected() {
        let err = Inventory::from_json(
            r#"[{"block":"A","room_no":"A-1","min_person":1,"max_person":2},
                {"block":"A","room_no":"A-1","min_person":1,"max_person":2}]"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate room A/A-1"));
    }

    #[test]
    fn quoted_cells_keep_delimiters() {
        let inv = Inventory::from_delimited(
            "block,room_no,floor,min_person,max_person\n\
             A,A-1,\"Ground, East\",1,2\n\
             \"Old C\",C-1,\"The \"\"Annex\"\"\",2,3\n",
        )
        .unwrap();
        assert_eq!(inv.len(), 2);
        assert_eq!(inv.get(&RoomRef::new("A", "A-1")).unwrap().floor, "Ground, East");
        assert_eq!(inv.get(&RoomRef::new("Old C", "C-1")).unwrap().floor, "The \"Annex\"");
    }

    #[test]
    fn split_row_handles_quotes() {
        assert_eq!(split_row(r#"a; "b;c" ;d"#, ';'), vec!["a", "b;c", "d"]);
        assert_eq!(split_row("x,,y", ','), vec!["x", "", "y"]);
    }

    #[test]
    fn ragged_row_rejected() {
        let err = Inventory::from_delimited("block,room_no,min_person,max_person\nA,A-1,1\n").unwrap_err();
        assert!(matches!(err, DataLoadError::Malformed(_)));
    }

    #[test]
    fn not_json_rejected() {
        assert!(Inventory::from_json("<html>404</html>").is_err());
    }

    #[test]
    fn blocks_in_first_seen_order() {
        let inv = Inventory::from_json(
            r#"[{"block":"B","room_no":"B-1","min_person":1,"max_person":2},
                {"block":"A","room_no":"A-1","min_person":1,"max_person":2},
                {"block":"B","room_no":"B-2","min_person":1,"max_person":2}]"#,
        )
        .unwrap();
        assert_eq!(inv.blocks(), vec!["B", "A"]);
        assert_eq!(inv.rooms_in_block("B").count(), 2);
        assert_eq!(inv.rooms_in_block("C").count(), 0);
    }
}
