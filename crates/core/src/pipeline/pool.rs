//! Static pool of creators that discovery selects from.

use std::path::Path;

use super::Creator;

/// The creators known to the system.
#[derive(Debug, Clone, Default)]
pub struct CreatorPool {
    creators: Vec<Creator>,
}

impl CreatorPool {
    pub fn new(creators: Vec<Creator>) -> Self {
        Self { creators }
    }

    /// Load a pool from a JSON array of creators.
    pub fn from_json_file(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let creators: Vec<Creator> = serde_json::from_str(&data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(Self::new(creators))
    }

    pub fn creators(&self) -> &[Creator] {
        &self.creators
    }

    pub fn get(&self, id: &str) -> Option<&Creator> {
        self.creators.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.creators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }

    /// A small built-in roster used when no pool file is configured.
    pub fn builtin() -> Self {
        let creator = |id: &str,
                       name: &str,
                       handle: &str,
                       platform: &str,
                       followers: u64,
                       engagement_rate: f64,
                       niches: &[&str],
                       location: &str,
                       rate_per_post: f64,
                       bio: &str| Creator {
            id: id.to_string(),
            name: name.to_string(),
            handle: handle.to_string(),
            platform: platform.to_string(),
            followers,
            engagement_rate,
            niches: niches.iter().map(|n| n.to_string()).collect(),
            location: location.to_string(),
            rate_per_post,
            bio: bio.to_string(),
        };

        Self::new(vec![
            creator(
                "cr-001",
                "Priya Sharma",
                "priyastyles",
                "instagram",
                245_000,
                4.8,
                &["fashion", "lifestyle"],
                "Mumbai, India",
                18_000.0,
                "Everyday fashion and sustainable styling tips",
            ),
            creator(
                "cr-002",
                "Arjun Mehta",
                "techwitharjun",
                "youtube",
                820_000,
                3.1,
                &["technology", "gadgets"],
                "Bengaluru, India",
                55_000.0,
                "Honest gadget reviews and tech explainers",
            ),
            creator(
                "cr-003",
                "Neha Kapoor",
                "fitwithneha",
                "instagram",
                132_000,
                6.2,
                &["fitness", "health", "lifestyle"],
                "Delhi, India",
                9_500.0,
                "Home workouts, nutrition and wellness routines",
            ),
            creator(
                "cr-004",
                "Rohan Das",
                "rohancooks",
                "youtube",
                410_000,
                5.4,
                &["food", "cooking"],
                "Kolkata, India",
                32_000.0,
                "Regional recipes and street food adventures",
            ),
            creator(
                "cr-005",
                "Ananya Iyer",
                "ananya.travels",
                "instagram",
                98_000,
                7.1,
                &["travel", "lifestyle", "photography"],
                "Chennai, India",
                7_000.0,
                "Slow travel stories and budget itineraries",
            ),
            creator(
                "cr-006",
                "Kabir Singh",
                "kabirgames",
                "tiktok",
                1_250_000,
                8.9,
                &["gaming", "entertainment"],
                "Pune, India",
                40_000.0,
                "Mobile gaming highlights and comedy skits",
            ),
            creator(
                "cr-007",
                "Meera Joshi",
                "meerabeauty",
                "youtube",
                156_000,
                4.3,
                &["beauty", "skincare", "fashion"],
                "Hyderabad, India",
                15_000.0,
                "Skincare routines for Indian skin types",
            ),
            creator(
                "cr-008",
                "Vikram Rao",
                "financewithvikram",
                "instagram",
                4_800,
                9.5,
                &["finance", "education"],
                "Ahmedabad, India",
                2_500.0,
                "Personal finance basics for first jobbers",
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_pool() {
        let pool = CreatorPool::builtin();
        assert_eq!(pool.len(), 8);
        assert!(pool.get("cr-003").is_some());
        assert!(pool.get("cr-999").is_none());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        let creators = vec![CreatorPool::builtin().creators()[0].clone()];
        write!(file, "{}", serde_json::to_string(&creators).unwrap()).unwrap();

        let pool = CreatorPool::from_json_file(file.path()).unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.creators()[0].handle, "priyastyles");
    }

    #[test]
    fn test_from_json_file_invalid() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = CreatorPool::from_json_file(file.path()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
