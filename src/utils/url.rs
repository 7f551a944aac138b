//! URL and query string helpers for media URLs

use url::{form_urlencoded, Url};

/// Fields carried by a `signatureCipher` value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CipherParams {
    /// Scrambled signature (`s`)
    pub signature: Option<String>,
    /// Query parameter the deciphered signature goes into (`sp`)
    pub signature_param: Option<String>,
    /// Embedded media URL (`url`)
    pub url: Option<String>,
}

/// Parse a `signatureCipher` query string; values come back percent-decoded
pub fn parse_cipher(cipher: &str) -> CipherParams {
    let mut params = CipherParams::default();
    for (key, value) in form_urlencoded::parse(cipher.as_bytes()) {
        let slot = match key.as_ref() {
            "s" => &mut params.signature,
            "sp" => &mut params.signature_param,
            "url" => &mut params.url,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }
    params
}

/// First value of query parameter `name`
pub fn get_query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Set query parameter `name`, replacing the first occurrence in place and
/// dropping any others, or appending it when absent
pub fn set_query_param(url: &mut Url, name: &str, value: &str) {
    let mut replaced = false;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter_map(|(key, existing)| {
            if key != name {
                return Some((key.into_owned(), existing.into_owned()));
            }
            if replaced {
                return None;
            }
            replaced = true;
            Some((key.into_owned(), value.to_string()))
        })
        .collect();

    let mut query = url.query_pairs_mut();
    query.clear();
    query.extend_pairs(pairs);
    if !replaced {
        query.append_pair(name, value);
    }
}
