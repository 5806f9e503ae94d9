//! Source container listing as a lazy stream over segmented pages.

use std::collections::VecDeque;

use futures::stream::{self, Stream};

use crate::contract::{ObjectDescriptor, StorageClient, StorageError};

struct ListState {
    buffer: VecDeque<ObjectDescriptor>,
    continuation: Option<String>,
    exhausted: bool,
}

/// Streams every blob in the source container under `prefix`, in listing
/// order, requesting further pages while the service returns a continuation
/// token. Finite and not restartable; the token never leaves this function.
///
/// A failed page fetch surfaces through the stream and ends it. The caller
/// treats that as fatal for the run.
pub fn list_objects<'a, C>(
    client: &'a C,
    prefix: &'a str,
) -> impl Stream<Item = Result<ObjectDescriptor, StorageError>> + 'a
where
    C: StorageClient + ?Sized,
{
    let state = ListState {
        buffer: VecDeque::new(),
        continuation: None,
        exhausted: false,
    };

    stream::try_unfold(state, move |mut state| async move {
        loop {
            if let Some(object) = state.buffer.pop_front() {
                return Ok(Some((object, state)));
            }
            if state.exhausted {
                return Ok(None);
            }
            let page = client.list_page(prefix, state.continuation.take()).await?;
            state.exhausted = page.continuation.is_none();
            state.continuation = page.continuation;
            state.buffer = page.objects.into();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{MockStorageClient, ObjectPage};
    use futures::TryStreamExt;

    fn descriptor(name: &str) -> ObjectDescriptor {
        ObjectDescriptor {
            name: name.to_owned(),
            uri: format!("https://acct.example/source/{name}"),
        }
    }

    #[tokio::test]
    async fn follows_continuation_tokens_across_pages() {
        let mut client = MockStorageClient::new();
        client
            .expect_list_page()
            .withf(|_, continuation| continuation.is_none())
            .return_once(|_, _| {
                Ok(ObjectPage {
                    objects: vec![descriptor("a.txt"), descriptor("b.txt")],
                    continuation: Some("t1".into()),
                })
            });
        client
            .expect_list_page()
            .withf(|_, continuation| continuation.as_deref() == Some("t1"))
            .return_once(|_, _| {
                Ok(ObjectPage {
                    objects: vec![descriptor("c.txt")],
                    continuation: None,
                })
            });

        let names: Vec<String> = list_objects(&client, "")
            .map_ok(|object| object.name)
            .try_collect()
            .await
            .expect("listing should succeed");
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[tokio::test]
    async fn empty_container_yields_nothing() {
        let mut client = MockStorageClient::new();
        client
            .expect_list_page()
            .return_once(|_, _| Ok(ObjectPage::default()));

        let objects: Vec<ObjectDescriptor> = list_objects(&client, "")
            .try_collect()
            .await
            .expect("listing should succeed");
        assert!(objects.is_empty());
    }

    #[tokio::test]
    async fn page_failure_surfaces_through_the_stream() {
        let mut client = MockStorageClient::new();
        client
            .expect_list_page()
            .withf(|_, continuation| continuation.is_none())
            .return_once(|_, _| {
                Ok(ObjectPage {
                    objects: vec![descriptor("a.txt")],
                    continuation: Some("t1".into()),
                })
            });
        client
            .expect_list_page()
            .withf(|_, continuation| continuation.is_some())
            .return_once(|_, _| Err("listing denied".into()));

        let result: Result<Vec<ObjectDescriptor>, StorageError> =
            list_objects(&client, "").try_collect().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn prefix_is_forwarded_to_every_page_request() {
        let mut client = MockStorageClient::new();
        client
            .expect_list_page()
            .withf(|prefix, _| prefix == "exports/")
            .return_once(|_, _| Ok(ObjectPage::default()));

        let objects: Vec<ObjectDescriptor> = list_objects(&client, "exports/")
            .try_collect()
            .await
            .expect("listing should succeed");
        assert!(objects.is_empty());
    }
}
