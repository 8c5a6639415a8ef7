//! Like/unlike transitions on top of a [`LikeSet`].

use std::sync::Arc;

use crate::db::models::{Review, UserId};
use crate::error::{AppError, AppResult};
use crate::guard::Identity;
use crate::store::{LikeSet, Store};

#[derive(Clone)]
pub struct LikeService {
    likes: Arc<dyn LikeSet>,
    reviews: Arc<dyn Store<Review>>,
}

impl LikeService {
    pub fn new(likes: Arc<dyn LikeSet>, reviews: Arc<dyn Store<Review>>) -> Self {
        Self { likes, reviews }
    }

    /// Add the acting user to the review's like set. Returns the new set.
    pub async fn like(&self, identity: &Identity, review: i64) -> AppResult<Vec<UserId>> {
        let user = identity.require()?;
        self.reviews.get(review).await?;

        if !self.likes.add(review, user.id).await? {
            return Err(AppError::Conflict("Already liked this review".into()));
        }
        tracing::info!(review, user = %user.id, "review liked");
        Ok(self.likes.likers(review).await?)
    }

    /// Remove the acting user from the review's like set. Returns the new set.
    pub async fn unlike(&self, identity: &Identity, review: i64) -> AppResult<Vec<UserId>> {
        let user = identity.require()?;
        self.reviews.get(review).await?;

        if !self.likes.remove(review, user.id).await? {
            return Err(AppError::NotLiked);
        }
        tracing::info!(review, user = %user.id, "review unliked");
        Ok(self.likes.likers(review).await?)
    }
}
