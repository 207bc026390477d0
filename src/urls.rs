//! Reverse routing for the pages moderation actions redirect to.

use crate::models::{ForumModel, TopicModel};

pub const API_PREFIX: &str = "/api/v1";

pub fn forum_url(forum: &ForumModel) -> String {
    format!("{}/forums/{}", API_PREFIX, forum.slug)
}

/// The topic page lives under the forum that currently holds it.
pub fn topic_url(forum: &ForumModel, topic: &TopicModel) -> String {
    format!("{}/topics/{}", forum_url(forum), topic.slug)
}
