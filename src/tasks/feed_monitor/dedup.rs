use crate::models::feed_item::FeedItem;

/// What a feed's latest entries mean relative to its checkpoint.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Selection {
    /// Items to deliver, oldest first.
    pub new_items: Vec<FeedItem>,
    /// Set on first contact: checkpoint to record without delivering anything.
    pub seed_link: Option<String>,
}

/// Picks the entries published since `checkpoint`.
///
/// `items` must be newest-first, as feeds publish them. Items without a link
/// are dropped. With `only_latest` the newest linked item is returned and the
/// checkpoint is ignored. With no checkpoint nothing is selected and the
/// newest link is reported as a seed. When the checkpoint is no longer in the
/// feed every item is treated as new.
pub fn select_new_items(
    items: Vec<FeedItem>,
    checkpoint: Option<&str>,
    only_latest: bool,
) -> Selection {
    let mut linked = items.into_iter().filter(FeedItem::has_link);

    if only_latest {
        return Selection {
            new_items: linked.next().into_iter().collect(),
            seed_link: None,
        };
    }

    let Some(checkpoint) = checkpoint else {
        return Selection {
            new_items: Vec::new(),
            seed_link: linked.next().map(|item| item.link),
        };
    };

    let mut new_items: Vec<FeedItem> = linked.take_while(|item| item.link != checkpoint).collect();
    new_items.reverse();

    Selection {
        new_items,
        seed_link: None,
    }
}
