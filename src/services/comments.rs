//! Comments Services, presents the append-only comment surface of a product.
use futures::future;

use validator::Validate;

use errors::Error;
use models::{Comment, NewComment, ProductId};
use repos::ReposFactory;
use services::types::ServiceFuture;
use services::Service;

pub trait CommentsService {
    /// Appends a comment to a product
    fn create_comment(&self, product_id: ProductId, payload: NewComment) -> ServiceFuture<Comment>;
    /// All comments of a product, newest first
    fn list_comments(&self, product_id: ProductId) -> ServiceFuture<Vec<Comment>>;
}

impl<F: ReposFactory> CommentsService for Service<F> {
    /// Appends a comment to a product
    fn create_comment(&self, product_id_arg: ProductId, payload: NewComment) -> ServiceFuture<Comment> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        if let Err(e) = payload.validate() {
            return Box::new(future::err(
                format_err!("Validation of NewComment failed")
                    .context(Error::Validate(e))
                    .into(),
            ));
        }

        self.spawn_on_pool(move |conn| {
            let comments_repo = repo_factory.create_comments_repo(&*conn, user_id);
            comments_repo
                .create(product_id_arg, payload)
                .map_err(|e| e.context("Service Comments, create_comment endpoint error occurred.").into())
        })
    }

    /// All comments of a product, newest first
    fn list_comments(&self, product_id_arg: ProductId) -> ServiceFuture<Vec<Comment>> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let comments_repo = repo_factory.create_comments_repo(&*conn, user_id);
            comments_repo
                .list_for_product(product_id_arg)
                .map_err(|e| e.context("Service Comments, list_comments endpoint error occurred.").into())
        })
    }
}

#[cfg(test)]
pub mod tests {
    use futures::Future;

    use errors::Error;
    use models::*;
    use repos::repo_factory::tests::*;
    use services::*;

    fn create_new_comment(text: &str) -> NewComment {
        NewComment {
            user_email: MOCK_USER_EMAIL.to_string(),
            user_name: Some("Test User".to_string()),
            user_photo: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_create_comment() {
        let service = create_service(Some(MOCK_USER_ID), Some(MOCK_USER_EMAIL.to_string()));
        let comment = service
            .create_comment(MOCK_PRODUCT_ID, create_new_comment("Looks great"))
            .wait()
            .unwrap();
        assert_eq!(comment.product_id, MOCK_PRODUCT_ID);
        assert_eq!(comment.text, "Looks great");
    }

    #[test]
    fn test_create_comment_rejects_empty_text() {
        let service = create_service(Some(MOCK_USER_ID), Some(MOCK_USER_EMAIL.to_string()));
        let err = service
            .create_comment(MOCK_PRODUCT_ID, create_new_comment(""))
            .wait()
            .unwrap_err();
        assert!(error_is(&err, |e| match *e {
            Error::Validate(_) => true,
            _ => false,
        }));
    }

    #[test]
    fn test_list_comments() {
        let service = create_service(Some(MOCK_USER_ID), Some(MOCK_USER_EMAIL.to_string()));
        let comments = service.list_comments(MOCK_PRODUCT_ID).wait().unwrap();
        assert_eq!(comments.len(), 1);
    }
}
