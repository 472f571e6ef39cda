use serde::Serialize;

use crate::error::Result;

/// Serial reported by the end-of-record sentinel.  Real serials are allocated
/// densely from 0, so nothing legitimate gets anywhere near this, but ordering
/// of `SerialItem` doesn't rely on that: the sentinel always sorts last.
pub const SENTINEL_SERIAL: u32 = u32::MAX;

/// Anything that occurs in a particular blob (or at a particular version, in
/// the case of path history).
pub trait Serial {
    fn serial(&self) -> u32;
}

/// A decoded tuple, or the terminal marker that record iterators emit when
/// asked to.  The marker carries no payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SerialItem<T> {
    Item(T),
    Sentinel,
}

impl<T: Serial> SerialItem<T> {
    pub fn serial(&self) -> u32 {
        match self {
            SerialItem::Item(item) => item.serial(),
            SerialItem::Sentinel => SENTINEL_SERIAL,
        }
    }

    /// Sort key that places the sentinel strictly after every real item,
    /// including one whose serial happens to be `SENTINEL_SERIAL`.
    pub fn order_key(&self) -> (bool, u32) {
        (self.is_sentinel(), self.serial())
    }
}

impl<T> SerialItem<T> {
    pub fn is_sentinel(&self) -> bool {
        matches!(self, SerialItem::Sentinel)
    }

    pub fn into_item(self) -> Option<T> {
        match self {
            SerialItem::Item(item) => Some(item),
            SerialItem::Sentinel => None,
        }
    }
}

/// Adapts a fallible tuple iterator into one that yields `SerialItem`s,
/// optionally followed by exactly one `SerialItem::Sentinel`.
pub struct WithSentinel<I> {
    inner: I,
    sentinel_pending: bool,
}

impl<I> WithSentinel<I> {
    pub fn new(inner: I, include_sentinel: bool) -> Self {
        WithSentinel {
            inner,
            sentinel_pending: include_sentinel,
        }
    }
}

impl<T, I> Iterator for WithSentinel<I>
where
    I: Iterator<Item = Result<T>>,
{
    type Item = Result<SerialItem<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.next() {
            Some(Ok(item)) => Some(Ok(SerialItem::Item(item))),
            Some(Err(err)) => {
                // Nothing after a corrupt tuple can be trusted.
                self.sentinel_pending = false;
                Some(Err(err))
            }
            None if self.sentinel_pending => {
                self.sentinel_pending = false;
                Some(Ok(SerialItem::Sentinel))
            }
            None => None,
        }
    }
}

/// Walks two serial-ordered streams in lockstep and yields every pairing of a
/// left item with a right item of the same serial.
///
/// The left side is expected to hold each serial at most once (a list of
/// blobs, say) while the right side may repeat serials (several definitions
/// of one identifier in one blob).  Both sides must be sorted by serial; the
/// streams are usually sentinel-terminated, and a stream that simply runs out
/// is treated as if it had been.
pub fn merge_by_serial<A, B, L, R>(left: L, right: R) -> MergeBySerial<A, B, L, R>
where
    A: Serial + Clone,
    B: Serial,
    L: Iterator<Item = Result<SerialItem<A>>>,
    R: Iterator<Item = Result<SerialItem<B>>>,
{
    MergeBySerial {
        left,
        right,
        cur_left: None,
        cur_right: None,
        done: false,
    }
}

pub struct MergeBySerial<A, B, L, R> {
    left: L,
    right: R,
    cur_left: Option<SerialItem<A>>,
    cur_right: Option<SerialItem<B>>,
    done: bool,
}

fn pull<T, I>(iter: &mut I) -> Result<SerialItem<T>>
where
    I: Iterator<Item = Result<SerialItem<T>>>,
{
    iter.next().unwrap_or(Ok(SerialItem::Sentinel))
}

impl<A, B, L, R> MergeBySerial<A, B, L, R>
where
    A: Serial + Clone,
    B: Serial,
    L: Iterator<Item = Result<SerialItem<A>>>,
    R: Iterator<Item = Result<SerialItem<B>>>,
{
    fn step(&mut self) -> Result<Option<(A, B)>> {
        loop {
            let left = match self.cur_left.take() {
                Some(item) => item,
                None => pull(&mut self.left)?,
            };
            let right = match self.cur_right.take() {
                Some(item) => item,
                None => pull(&mut self.right)?,
            };

            let (lkey, rkey) = (left.order_key(), right.order_key());
            if lkey < rkey {
                // Drop the left item; keep the right one for the next round.
                self.cur_right = Some(right);
            } else if lkey > rkey {
                self.cur_left = Some(left);
            } else {
                match (left, right) {
                    (SerialItem::Item(a), SerialItem::Item(b)) => {
                        self.cur_left = Some(SerialItem::Item(a.clone()));
                        return Ok(Some((a, b)));
                    }
                    _ => return Ok(None),
                }
            }
        }
    }
}

impl<A, B, L, R> Iterator for MergeBySerial<A, B, L, R>
where
    A: Serial + Clone,
    B: Serial,
    L: Iterator<Item = Result<SerialItem<A>>>,
    R: Iterator<Item = Result<SerialItem<B>>>,
{
    type Item = Result<(A, B)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(pair)) => Some(Ok(pair)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::XrefError;

    #[derive(Clone, Debug, PartialEq)]
    struct Blob(u32, &'static str);

    impl Serial for Blob {
        fn serial(&self) -> u32 {
            self.0
        }
    }

    fn stream(items: Vec<Blob>) -> impl Iterator<Item = Result<SerialItem<Blob>>> {
        WithSentinel::new(items.into_iter().map(Ok::<_, XrefError>), true)
    }

    #[test]
    fn test_sentinel_sorts_last() {
        let real: SerialItem<Blob> = SerialItem::Item(Blob(SENTINEL_SERIAL, "max"));
        let end: SerialItem<Blob> = SerialItem::Sentinel;
        assert!(real.order_key() < end.order_key());
        assert_eq!(end.serial(), SENTINEL_SERIAL);
    }

    #[test]
    fn test_with_sentinel_emits_one_marker() {
        let items: Vec<_> = stream(vec![Blob(1, "a")]).map(|r| r.unwrap()).collect();
        assert_eq!(items, vec![SerialItem::Item(Blob(1, "a")), SerialItem::Sentinel]);

        let bare: Vec<_> = WithSentinel::new(vec![Ok::<_, XrefError>(Blob(1, "a"))].into_iter(), false)
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(bare, vec![SerialItem::Item(Blob(1, "a"))]);
    }

    #[test]
    fn test_no_sentinel_after_error() {
        let inner = vec![Err(XrefError::corrupt("bad")), Ok(Blob(1, "a"))].into_iter();
        let mut iter = WithSentinel::new(inner, true);
        assert!(iter.next().unwrap().is_err());
        assert!(matches!(iter.next(), Some(Ok(SerialItem::Item(_)))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_merge_pairs_matching_serials() {
        let blobs = stream(vec![Blob(2, "a.c"), Blob(5, "b.c"), Blob(9, "c.c")]);
        let defs = stream(vec![
            Blob(1, "x"),
            Blob(5, "f"),
            Blob(5, "g"),
            Blob(7, "h"),
            Blob(9, "i"),
        ]);

        let pairs: Vec<_> = merge_by_serial(blobs, defs)
            .map(|r| r.unwrap())
            .map(|(a, b)| (a.1, b.1))
            .collect();
        assert_eq!(pairs, vec![("b.c", "f"), ("b.c", "g"), ("c.c", "i")]);
    }

    #[test]
    fn test_merge_without_sentinels() {
        let left = vec![Ok::<_, XrefError>(SerialItem::Item(Blob(3, "l")))].into_iter();
        let right = vec![Ok::<_, XrefError>(SerialItem::Item(Blob(3, "r")))].into_iter();
        let pairs: Vec<_> = merge_by_serial(left, right).map(|r| r.unwrap()).collect();
        assert_eq!(pairs, vec![(Blob(3, "l"), Blob(3, "r"))]);
    }
}
