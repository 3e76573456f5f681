use std::fmt;

use serde::{Deserialize, Serialize};

/// The three supportive reactions a reader can leave on a story or comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    Heart,
    Hug,
    Strength,
}

impl ReactionKind {
    pub const ALL: [Self; 3] = [Self::Heart, Self::Hug, Self::Strength];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "heart" => Some(Self::Heart),
            "hug" => Some(Self::Hug),
            "strength" => Some(Self::Strength),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heart => "heart",
            Self::Hug => "hug",
            Self::Strength => "strength",
        }
    }

    /// Capitalized label used in confirmation messages ("Heart reaction added").
    pub fn title(self) -> &'static str {
        match self {
            Self::Heart => "Heart",
            Self::Hug => "Hug",
            Self::Strength => "Strength",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Heart => "\u{2764}\u{fe0f}",
            Self::Hug => "\u{1f917}",
            Self::Strength => "\u{2728}",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of reply a response is meant to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    #[default]
    Support,
    Advice,
    Experience,
}

impl ResponseType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "support" => Some(Self::Support),
            "advice" => Some(Self::Advice),
            "experience" => Some(Self::Experience),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Support => "support",
            Self::Advice => "advice",
            Self::Experience => "experience",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    StoryComment,
    CommentReply,
    CommentReaction,
}

impl NotificationKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "story_comment" => Some(Self::StoryComment),
            "comment_reply" => Some(Self::CommentReply),
            "comment_reaction" => Some(Self::CommentReaction),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StoryComment => "story_comment",
            Self::CommentReply => "comment_reply",
            Self::CommentReaction => "comment_reaction",
        }
    }
}

/// Content that can be reported to moderators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportTarget {
    Story,
    Response,
}

impl ReportTarget {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "story" => Some(Self::Story),
            "response" => Some(Self::Response),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Story => "story",
            Self::Response => "response",
        }
    }
}

/// Ordering for the story feed. Unknown values fall back to newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorySort {
    #[default]
    CreatedAt,
    HeartCount,
    ResponseCount,
}

impl StorySort {
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw {
            Some("heart_count") => Self::HeartCount,
            Some("response_count") => Self::ResponseCount,
            _ => Self::CreatedAt,
        }
    }
}
