use crate::Error;

#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct UserImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub png: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webp: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct User {
    pub username: String,
    pub image: UserImage,
}

impl User {
    pub fn new(username: String, png: String) -> User {
        User {
            username,
            image: UserImage {
                png: Some(png),
                webp: None,
            },
        }
    }

    /// Usernames are unique regardless of case
    pub fn same_name(&self, username: &str) -> bool {
        self.username.to_lowercase() == username.to_lowercase()
    }

    /// The `@username` token replies use to address this user
    pub fn mention(&self) -> String {
        format!("@{}", self.username)
    }

    pub fn avatar(&self) -> Option<&str> {
        self.image
            .png
            .as_deref()
            .or(self.image.webp.as_deref())
            .filter(|p| !p.is_empty())
    }

    // Checks what signup requires before a user may be added to `existing`.
    // The store itself never calls this from submit_user, only from signup.
    pub fn validate<'a, I>(&self, existing: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = &'a User>,
    {
        if self.username.trim().is_empty() {
            return Err(Error::EmptyUsername);
        }
        if existing.into_iter().any(|u| u.same_name(&self.username)) {
            return Err(Error::NameAlreadyUsed(self.username.clone()));
        }
        if self.avatar().is_none() {
            return Err(Error::MissingAvatar);
        }
        Ok(())
    }
}
