//! Canned data shown when the API cannot be reached.
//!
//! Nothing here is persisted or sent upstream; a controller in offline mode
//! refuses mutations until a load succeeds again.

use serde_json::{json, Value};

/// The footer's social links, as shipped with the site.
pub fn social_links() -> Vec<Value> {
    let links = [
        ("offline-facebook", "Facebook", "https://www.facebook.com/", 1),
        ("offline-instagram", "Instagram", "https://www.instagram.com/", 2),
        ("offline-youtube", "YouTube", "https://www.youtube.com/", 3),
        ("offline-linkedin", "LinkedIn", "https://www.linkedin.com/", 4),
    ];

    links
        .into_iter()
        .map(|(id, platform, url, order)| {
            json!({
                "id": id,
                "platform": platform,
                "url": url,
                "displayOrder": order,
                "isActive": true
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::decode_record;
    use crate::models::SocialLink;

    #[test]
    fn test_fallback_decodes() {
        let links: Vec<SocialLink> = social_links()
            .into_iter()
            .map(|raw| decode_record(raw).unwrap())
            .collect();
        assert_eq!(links.len(), 4);
        assert!(links.iter().all(|l| l.is_active));
        assert_eq!(links[0].platform, "Facebook");
    }
}
