use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::error::Category;

use super::{Result, WebError};
use crate::core::{Command, CommandId, TeamId, UserId};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CreateCommandRequest {
    #[serde(alias = "name")]
    pub name: String,
    #[serde(alias = "image")]
    pub image: String,
    #[serde(alias = "command")]
    pub command: String,
}

impl CreateCommandRequest {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(WebError::InvalidRequestFormat("Name is required".into()));
        }
        if self.image.is_empty() {
            return Err(WebError::InvalidRequestFormat("Image is required".into()));
        }
        Ok(())
    }

    pub fn into_command(self) -> Command {
        Command::new(self.name, self.image).with_command(self.command)
    }
}

/// Full update; an empty field leaves the stored value unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UpdateCommandRequest {
    #[serde(alias = "name")]
    pub name: String,
    #[serde(alias = "image")]
    pub image: String,
    #[serde(alias = "command")]
    pub command: String,
}

impl UpdateCommandRequest {
    pub fn apply_to(self, command: &mut Command) {
        if !self.name.is_empty() {
            command.name = self.name;
        }
        if !self.image.is_empty() {
            command.image = self.image;
        }
        if !self.command.is_empty() {
            command.command = self.command;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UpdateAccessRequest {
    #[serde(alias = "authorizedUsers")]
    pub authorized_users: Vec<UserId>,
    #[serde(alias = "authorizedTeams")]
    pub authorized_teams: Vec<TeamId>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CreatedResponse {
    pub id: CommandId,
}

/// Decodes a JSON request body regardless of its declared content type.
pub fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|err| match err.classify() {
        Category::Data => WebError::InvalidRequestFormat(err.to_string()),
        Category::Syntax | Category::Eof | Category::Io => WebError::InvalidJson(err.to_string()),
    })
}

pub fn parse_id(raw: &str) -> Result<CommandId> {
    raw.parse()
        .map_err(|_| WebError::InvalidId(raw.to_string()))
}
