use std::collections::HashMap;

use anyhow::{Result, anyhow};
use serde_json::Value;

/// Slots at or above this value belong to the Dire side.
const DIRE_SLOT_BASE: i64 = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRow {
    pub id: i64,
    pub radiant_won: bool,
    pub is_pro: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRow {
    pub id: i64,
    pub name: Option<String>,
    pub mmr: Option<i64>,
    pub country: Option<String>,
    pub is_pro: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchDetailRow {
    pub match_id: i64,
    pub player_id: i64,
    pub is_radiant: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRow {
    pub match_id: i64,
    pub player_id: i64,
    pub message: String,
    pub time: i64,
}

/// An account-bearing entry of a match's `players` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub account_id: i64,
    pub player_slot: Option<i64>,
    pub is_radiant: bool,
}

/// Per-match lookup from seat number to account id, used to attribute chat.
#[derive(Debug, Clone, Default)]
pub struct SlotMap {
    slots: HashMap<i64, i64>,
}

impl SlotMap {
    pub fn from_participants(participants: &[Participant]) -> Self {
        let slots = participants
            .iter()
            .filter_map(|p| p.player_slot.map(|slot| (slot, p.account_id)))
            .collect();
        Self { slots }
    }

    pub fn resolve(&self, slot: i64) -> Option<i64> {
        self.slots.get(&slot).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

pub fn match_row(match_id: i64, v: &Value, is_pro: bool) -> Result<MatchRow> {
    let radiant_won = v
        .get("radiant_win")
        .and_then(Value::as_bool)
        .ok_or_else(|| anyhow!("match {match_id}: missing radiant_win"))?;
    Ok(MatchRow {
        id: match_id,
        radiant_won,
        is_pro,
    })
}

/// Anonymous players (no account id, or an account id of zero) are dropped.
pub fn participants(v: &Value) -> Vec<Participant> {
    let Some(players) = v.get("players").and_then(Value::as_array) else {
        return Vec::new();
    };
    players.iter().filter_map(parse_participant).collect()
}

fn parse_participant(p: &Value) -> Option<Participant> {
    let account_id = p.get("account_id").and_then(as_i64_any)?;
    if account_id == 0 {
        return None;
    }
    let player_slot = p.get("player_slot").and_then(as_i64_any);
    let is_radiant = p
        .get("isRadiant")
        .and_then(Value::as_bool)
        .or_else(|| player_slot.map(|slot| slot < DIRE_SLOT_BASE))
        .unwrap_or(false);
    Some(Participant {
        account_id,
        player_slot,
        is_radiant,
    })
}

pub fn participation_rows(match_id: i64, participants: &[Participant]) -> Vec<MatchDetailRow> {
    participants
        .iter()
        .map(|p| MatchDetailRow {
            match_id,
            player_id: p.account_id,
            is_radiant: p.is_radiant,
        })
        .collect()
}

pub fn has_chat(v: &Value) -> bool {
    v.get("chat")
        .and_then(Value::as_array)
        .is_some_and(|chat| !chat.is_empty())
}

/// Keeps typed chat lines whose sender slot resolves through `slots`.
/// Canned chat wheel lines and messages from anonymous seats are dropped.
pub fn chat_rows(match_id: i64, v: &Value, slots: &SlotMap) -> Vec<ChatRow> {
    let Some(chat) = v.get("chat").and_then(Value::as_array) else {
        return Vec::new();
    };
    chat.iter()
        .filter(|entry| is_typed_chat(entry))
        .filter_map(|entry| {
            let slot = entry.get("player_slot").and_then(as_i64_any)?;
            let player_id = slots.resolve(slot)?;
            let message = entry.get("key").and_then(Value::as_str)?.to_string();
            let time = entry.get("time").and_then(as_i64_any)?;
            Some(ChatRow {
                match_id,
                player_id,
                message,
                time,
            })
        })
        .collect()
}

fn is_typed_chat(entry: &Value) -> bool {
    entry.get("type").and_then(Value::as_str) == Some("chat")
}

/// Missing profile or estimate fields become NULL instead of failing the row.
pub fn player_row(account_id: i64, v: &Value, is_pro: bool) -> PlayerRow {
    let profile = v.get("profile");
    let name = profile
        .and_then(|p| p.get("personaname"))
        .and_then(Value::as_str)
        .map(|s| s.to_string());
    let country = profile
        .and_then(|p| p.get("loccountrycode"))
        .and_then(Value::as_str)
        .map(|s| s.to_string());
    let mmr = v
        .get("mmr_estimate")
        .and_then(|m| m.get("estimate"))
        .and_then(as_i64_any);
    PlayerRow {
        id: account_id,
        name,
        mmr,
        country,
        is_pro,
    }
}

/// One entry per element of a feed array (pro matches or a player's
/// history), in feed order; `None` where the element carries no usable
/// `match_id`.
pub fn match_ids(v: &Value) -> Vec<Option<i64>> {
    let Some(items) = v.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| item.get("match_id").and_then(as_i64_any))
        .collect()
}

fn as_i64_any(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    if let Some(f) = v.as_f64()
        && f.fract() == 0.0
    {
        return Some(f as i64);
    }
    v.as_str()?.trim().parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn as_i64_any_accepts_numbers_and_strings() {
        assert_eq!(as_i64_any(&json!(12)), Some(12));
        assert_eq!(as_i64_any(&json!(-3)), Some(-3));
        assert_eq!(as_i64_any(&json!(4200.0)), Some(4200));
        assert_eq!(as_i64_any(&json!(" 77 ")), Some(77));
        assert_eq!(as_i64_any(&json!(1.5)), None);
        assert_eq!(as_i64_any(&json!(null)), None);
    }

    #[test]
    fn side_falls_back_to_slot_when_flag_missing() {
        let v = json!({"players": [
            {"account_id": 1, "player_slot": 3},
            {"account_id": 2, "player_slot": 131},
        ]});
        let ps = participants(&v);
        assert!(ps[0].is_radiant);
        assert!(!ps[1].is_radiant);
    }

    #[test]
    fn participant_without_slot_is_kept_but_not_mapped() {
        let v = json!({"players": [{"account_id": 5, "isRadiant": true}]});
        let ps = participants(&v);
        assert_eq!(ps.len(), 1);
        assert!(SlotMap::from_participants(&ps).is_empty());
    }

    #[test]
    fn match_row_requires_radiant_win() {
        assert!(match_row(1, &json!({"players": []}), false).is_err());
        assert!(match_row(1, &json!({"radiant_win": null}), false).is_err());
        let row = match_row(1, &json!({"radiant_win": false}), true).expect("row");
        assert!(!row.radiant_won);
        assert!(row.is_pro);
    }

    #[test]
    fn has_chat_treats_null_and_empty_as_absent() {
        assert!(!has_chat(&json!({})));
        assert!(!has_chat(&json!({"chat": null})));
        assert!(!has_chat(&json!({"chat": []})));
        assert!(has_chat(&json!({"chat": [{"type": "chat"}]})));
    }
}
