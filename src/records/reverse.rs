//! Reverse-zone resolution for A/AAAA records.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::access;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};

/// The longest possible ip6.arpa name. Doubles as the initial match
/// threshold: a zone name found at or past this offset is no match at all.
const MAX_ARPA_LEN: usize = 72;

/// A resolved reverse zone: the owning domain and the canonical PTR name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseZone {
    pub zone_id: i64,
    pub reverse_name: String,
}

/// Canonical reverse name for an address record.
///
/// `1.2.3.4` → `4.3.2.1.in-addr.arpa`; for AAAA all 32 nibbles are reversed
/// and dot-joined under `ip6.arpa`. Returns `None` when the content does not
/// parse as an address of the record type: content is user supplied and was
/// validated upstream, so a parse failure here is tolerated rather than
/// reported.
pub fn reverse_name(rtype: &str, content: &str) -> AppResult<Option<String>> {
    match rtype {
        "A" => {
            let Ok(addr) = content.parse::<Ipv4Addr>() else {
                return Ok(None);
            };
            let o = addr.octets();
            Ok(Some(format!("{}.{}.{}.{}.in-addr.arpa", o[3], o[2], o[1], o[0])))
        }
        "AAAA" => {
            let Ok(addr) = content.parse::<Ipv6Addr>() else {
                return Ok(None);
            };
            let mut nibbles = Vec::with_capacity(32);
            for byte in addr.octets() {
                nibbles.push(format!("{:x}", byte >> 4));
                nibbles.push(format!("{:x}", byte & 0xf));
            }
            nibbles.reverse();
            Ok(Some(format!("{}.ip6.arpa", nibbles.join("."))))
        }
        other => Err(AppError::Semantic(format!(
            "record type {other} cannot carry a reverse mapping"
        ))),
    }
}

/// Pick the best matching reverse zone for `content` among the `.arpa`
/// domains visible to `user_id`.
///
/// The candidate whose name occurs earliest in the canonical reverse name
/// wins; candidates are scanned longest name first, so on a shared position
/// the most specific zone is kept.
pub async fn resolve(
    db: &DbPool,
    user_id: i64,
    rtype: &str,
    content: &str,
) -> AppResult<Option<ReverseZone>> {
    let Some(arpa) = reverse_name(rtype, content)? else {
        return Ok(None);
    };

    let user_is_admin = access::is_admin(db, user_id).await?;

    let candidates: Vec<(i64, String)> = sqlx::query_as(
        "SELECT D.id, D.name FROM domains D
         LEFT OUTER JOIN permissions P ON P.domain_id = D.id
         WHERE (P.user_id = ? OR ?) AND D.name LIKE '%.arpa'
         GROUP BY D.id
         ORDER BY length(D.name) DESC",
    )
    .bind(user_id)
    .bind(user_is_admin)
    .fetch_all(db)
    .await?;

    let mut best: Option<i64> = None;
    let mut best_pos = MAX_ARPA_LEN;
    for (id, name) in &candidates {
        if let Some(pos) = arpa.find(&name.to_lowercase()) {
            if pos < best_pos {
                best_pos = pos;
                best = Some(*id);
            }
        }
    }

    Ok(best.map(|zone_id| ReverseZone { zone_id, reverse_name: arpa }))
}
