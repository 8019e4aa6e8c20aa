use bson::{doc, oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};

/// Collection name for profiles
pub const PROFILE_COLLECTION: &str = "profiles";

/// Campus departments a profile may belong to
pub const DEPARTMENTS: [&str; 11] = [
    "CSE",
    "EEE",
    "ECE",
    "Civil Engineering",
    "Business Administration",
    "Law",
    "English",
    "Economics",
    "Sociology",
    "Development Studies",
    "Public Health",
];

/// Read-side department for users without a profile
pub const FALLBACK_DEPARTMENT: &str = "General";

pub const MAX_PROFILE_PHOTOS: usize = 5;

pub fn is_valid_department(department: &str) -> bool {
    DEPARTMENTS.contains(&department)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyLevel {
    #[default]
    Public,
    Friends,
    Private,
}

impl PrivacyLevel {
    /// Whether a viewer may see a field guarded by this level
    pub fn allows(&self, is_owner: bool, is_friend: bool) -> bool {
        match self {
            _ if is_owner => true,
            PrivacyLevel::Public => true,
            PrivacyLevel::Friends => is_friend,
            PrivacyLevel::Private => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacySettings {
    #[serde(default)]
    pub email: PrivacyLevel,
    #[serde(default)]
    pub student_id: PrivacyLevel,
    #[serde(default)]
    pub year: PrivacyLevel,
    #[serde(default)]
    pub section: PrivacyLevel,
    #[serde(default)]
    pub location: PrivacyLevel,
    #[serde(default)]
    pub interests: PrivacyLevel,
    #[serde(default)]
    pub department: PrivacyLevel,
    #[serde(default)]
    pub bio: PrivacyLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// One profile per user, keyed by Firebase uid
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub interests: Vec<String>,
    /// Newest first
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub friend_ids: Vec<String>,
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub linkedin_url: String,
    #[serde(default)]
    pub facebook_url: String,
    #[serde(default)]
    pub privacy: PrivacySettings,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Profile {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            user_id: user_id.into(),
            name: String::new(),
            bio: String::new(),
            interests: Vec::new(),
            photos: Vec::new(),
            cover_photo: None,
            location: None,
            department: String::new(),
            friend_ids: Vec::new(),
            student_id: String::new(),
            year: String::new(),
            section: String::new(),
            linkedin_url: String::new(),
            facebook_url: String::new(),
            privacy: PrivacySettings::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_friend(&self, uid: &str) -> bool {
        self.friend_ids.iter().any(|id| id == uid)
    }

    pub fn first_photo(&self) -> Option<&str> {
        self.photos.first().map(String::as_str)
    }
}

/// Put `photo` at the front of `photos` unless it is already present,
/// keeping at most [`MAX_PROFILE_PHOTOS`] entries.
pub fn prepend_photo(photos: &[String], photo: &str) -> Vec<String> {
    if photos.iter().any(|p| p == photo) {
        return photos.to_vec();
    }
    std::iter::once(photo.to_string())
        .chain(photos.iter().cloned())
        .take(MAX_PROFILE_PHOTOS)
        .collect()
}

/// Fields written by a profile upsert. `None` leaves a field untouched on
/// update and lets it take its default on insert.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub department: Option<String>,
    pub interests: Option<Vec<String>>,
    pub photos: Option<Vec<String>>,
    pub cover_photo: Option<String>,
    pub student_id: Option<String>,
    pub year: Option<String>,
    pub section: Option<String>,
    pub linkedin_url: Option<String>,
    pub facebook_url: Option<String>,
    pub privacy: Option<PrivacySettings>,
}

impl ProfileUpdate {
    /// `$set` document for the given fields
    pub fn set_document(&self, now: DateTime) -> Result<Document, bson::ser::Error> {
        let mut set = doc! { "updatedAt": now };
        let strings = [
            ("name", &self.name),
            ("bio", &self.bio),
            ("department", &self.department),
            ("coverPhoto", &self.cover_photo),
            ("studentId", &self.student_id),
            ("year", &self.year),
            ("section", &self.section),
            ("linkedinUrl", &self.linkedin_url),
            ("facebookUrl", &self.facebook_url),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                set.insert(key, value.clone());
            }
        }
        if let Some(interests) = &self.interests {
            set.insert("interests", interests.clone());
        }
        if let Some(photos) = &self.photos {
            set.insert("photos", photos.clone());
        }
        if let Some(privacy) = &self.privacy {
            set.insert("privacy", bson::to_bson(privacy)?);
        }
        Ok(set)
    }

    /// `$setOnInsert` document: defaults for every field the `$set` leaves out
    pub fn insert_defaults(
        &self,
        user_id: &str,
        set: &Document,
    ) -> Result<Document, bson::ser::Error> {
        let defaults = bson::to_document(&Profile::new(user_id))?;
        Ok(defaults
            .into_iter()
            .filter(|(key, _)| key != "userId" && !set.contains_key(key))
            .collect())
    }

    pub fn apply(&self, profile: &mut Profile, now: DateTime) {
        profile.updated_at = now;
        let strings = [
            (&mut profile.name, &self.name),
            (&mut profile.bio, &self.bio),
            (&mut profile.department, &self.department),
            (&mut profile.student_id, &self.student_id),
            (&mut profile.year, &self.year),
            (&mut profile.section, &self.section),
            (&mut profile.linkedin_url, &self.linkedin_url),
            (&mut profile.facebook_url, &self.facebook_url),
        ];
        for (field, value) in strings {
            if let Some(value) = value {
                *field = value.clone();
            }
        }
        if let Some(cover) = &self.cover_photo {
            profile.cover_photo = Some(cover.clone());
        }
        if let Some(interests) = &self.interests {
            profile.interests = interests.clone();
        }
        if let Some(photos) = &self.photos {
            profile.photos = photos.clone();
        }
        if let Some(privacy) = &self.privacy {
            profile.privacy = privacy.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photos(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_prepend_photo_caps_at_five() {
        let existing = photos(&["a", "b", "c", "d", "e"]);
        assert_eq!(prepend_photo(&existing, "f"), photos(&["f", "a", "b", "c", "d"]));
    }

    #[test]
    fn test_prepend_photo_skips_duplicates() {
        let existing = photos(&["a", "b"]);
        assert_eq!(prepend_photo(&existing, "b"), existing);
        assert_eq!(prepend_photo(&[], "a"), photos(&["a"]));
    }

    #[test]
    fn test_privacy_levels() {
        assert!(PrivacyLevel::Public.allows(false, false));
        assert!(!PrivacyLevel::Friends.allows(false, false));
        assert!(PrivacyLevel::Friends.allows(false, true));
        assert!(!PrivacyLevel::Private.allows(false, true));
        assert!(PrivacyLevel::Private.allows(true, false));
    }

    #[test]
    fn test_privacy_defaults_to_public() {
        let privacy: PrivacySettings = serde_json::from_str(r#"{"bio":"private"}"#).unwrap();
        assert_eq!(privacy.bio, PrivacyLevel::Private);
        assert_eq!(privacy.email, PrivacyLevel::Public);
        assert_eq!(privacy.department, PrivacyLevel::Public);
    }

    #[test]
    fn test_departments() {
        assert!(is_valid_department("CSE"));
        assert!(is_valid_department("Public Health"));
        assert!(!is_valid_department("General"));
        assert!(!is_valid_department("cse"));
    }

    #[test]
    fn test_insert_defaults_do_not_overlap_set() {
        let update = ProfileUpdate {
            name: Some("Rahim".into()),
            department: Some("CSE".into()),
            ..Default::default()
        };
        let set = update.set_document(DateTime::now()).unwrap();
        let defaults = update.insert_defaults("uid-1", &set).unwrap();

        for key in set.keys() {
            assert!(!defaults.contains_key(key), "{} in both", key);
        }
        assert!(!defaults.contains_key("userId"));
        assert!(defaults.contains_key("friendIds"));
        assert!(defaults.contains_key("privacy"));
        assert!(defaults.contains_key("createdAt"));
    }

    #[test]
    fn test_apply_leaves_missing_fields() {
        let mut profile = Profile::new("uid-1");
        profile.bio = "hello".into();
        ProfileUpdate {
            name: Some("Karim".into()),
            ..Default::default()
        }
        .apply(&mut profile, DateTime::now());
        assert_eq!(profile.name, "Karim");
        assert_eq!(profile.bio, "hello");
    }
}
