//! The IRCv3 batch framer (spec §4.2, Design Notes §9).
//!
//! Rather than the fragile `consumeBatch` boolean-sequence design the Open Questions in the spec
//! warn against, this framer resolves every arriving line to a monotonic sequence number and
//! sorts by it when a batch closes, so surfaced order is always arrival order regardless of how
//! deeply a line's batch was nested.
use std::collections::HashMap;

use relaychat_proto::message::ParsedMessage;

/// One IRCv3 batch: a reference tag, its declared type and parameters, the lines tagged directly
/// to it (not to a nested batch), and any batches nested within it.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    /// The `BATCH +<tag>` reference tag, without its sign.
    pub reference_tag: String,
    /// The batch type, e.g. `example.com/foo`, `netsplit`, `chathistory`.
    pub kind: String,
    /// Any parameters following the type token.
    pub parameters: Vec<String>,
    /// Lines tagged directly with this batch's reference tag, each paired with its arrival
    /// sequence number.
    pub lines: Vec<(u64, ParsedMessage)>,
    /// Batches nested directly within this one, keyed by their own reference tag.
    pub nested: HashMap<String, Batch>,
    /// Whether this batch has seen its `BATCH -<tag>` closer. Only meaningful for nested
    /// batches; a root batch that closes is immediately surfaced and removed from `open`.
    pub closed: bool,
}

impl Batch {
    fn new(reference_tag: String, kind: String, parameters: Vec<String>) -> Batch {
        Batch { reference_tag, kind, parameters, lines: Vec::new(), nested: HashMap::new(), closed: false }
    }

    /// Flattens this batch's own lines and every nested batch's lines into one arrival-ordered
    /// sequence, per testable property 2 ("order within a surfaced root-batch equals input
    /// order").
    pub fn flatten(&self) -> Vec<&ParsedMessage> {
        let mut all = self.collect();
        all.sort_by_key(|(seq, _)| *seq);
        all.into_iter().map(|(_, message)| message).collect()
    }

    fn collect(&self) -> Vec<(u64, &ParsedMessage)> {
        let mut all: Vec<(u64, &ParsedMessage)> = self.lines.iter().map(|(seq, m)| (*seq, m)).collect();
        for nested in self.nested.values() {
            all.extend(nested.collect());
        }
        all
    }
}

/// A completed unit the framer hands to the dispatcher: either a line with no batch involvement,
/// or a fully-closed root batch (with its nested tree intact).
#[derive(Clone, Debug, PartialEq)]
pub enum Unit {
    /// An un-batched line, surfaced immediately.
    Message(ParsedMessage),
    /// A root batch, surfaced only once its own `BATCH -<tag>` closer arrives.
    Batch(Batch),
}

/// Accumulates `BATCH +`/`BATCH -` framing and `batch=` tags into completed units.
#[derive(Debug, Default)]
pub struct BatchFramer {
    open: HashMap<String, Batch>,
    next_seq: u64,
}

impl BatchFramer {
    /// Creates an empty framer.
    pub fn new() -> BatchFramer {
        BatchFramer::default()
    }

    /// Feeds one parsed line through the framer. Returns `Some` exactly when this line completed
    /// a unit: either because it was itself un-batched, or because it was the closer for a
    /// currently-open root batch.
    pub fn push(&mut self, message: ParsedMessage) -> Option<Unit> {
        let seq = self.next_seq;
        self.next_seq += 1;

        match message.tags.get("batch").cloned() {
            None => self.push_unbatched(message),
            Some(batch_ref) => self.push_batched(message, &batch_ref, seq),
        }
    }

    fn push_unbatched(&mut self, message: ParsedMessage) -> Option<Unit> {
        if message.verb == "BATCH" {
            if let Some(first) = message.args.first().cloned() {
                if let Some(tag) = first.strip_prefix('+') {
                    let kind = message.args.get(1).cloned().unwrap_or_default();
                    let parameters = message.args.get(2..).map(<[String]>::to_vec).unwrap_or_default();
                    self.open.insert(tag.to_owned(), Batch::new(tag.to_owned(), kind, parameters));
                    return None;
                }
                if let Some(tag) = first.strip_prefix('-') {
                    return match self.open.remove(tag) {
                        Some(batch) => Some(Unit::Batch(batch)),
                        None => {
                            log::warn!("BATCH - for unknown reference tag {tag}");
                            None
                        }
                    };
                }
            }
        }
        Some(Unit::Message(message))
    }

    fn push_batched(&mut self, message: ParsedMessage, batch_ref: &str, seq: u64) -> Option<Unit> {
        if message.verb == "BATCH" {
            if let Some(first) = message.args.first().cloned() {
                if let Some(tag) = first.strip_prefix('+') {
                    let kind = message.args.get(1).cloned().unwrap_or_default();
                    let parameters = message.args.get(2..).map(<[String]>::to_vec).unwrap_or_default();
                    match find_mut(&mut self.open, batch_ref) {
                        Some(parent) => {
                            parent.nested.insert(tag.to_owned(), Batch::new(tag.to_owned(), kind, parameters));
                        }
                        None => log::warn!("nested BATCH + under unknown reference tag {batch_ref}"),
                    }
                    return None;
                }
                if let Some(tag) = first.strip_prefix('-') {
                    match find_mut(&mut self.open, batch_ref) {
                        Some(parent) => match parent.nested.get_mut(tag) {
                            Some(nested) => nested.closed = true,
                            None => log::warn!("BATCH - for unknown nested reference tag {tag}"),
                        },
                        None => log::warn!("nested BATCH - under unknown reference tag {batch_ref}"),
                    }
                    return None;
                }
            }
        }

        match find_mut(&mut self.open, batch_ref) {
            Some(batch) => {
                batch.lines.push((seq, message));
                None
            }
            None => {
                log::warn!("message tagged with unknown batch {batch_ref}, surfacing unbatched");
                Some(Unit::Message(message))
            }
        }
    }
}

/// Recursively searches `batches` and their nested trees for the batch with reference tag `tag`.
fn find_mut<'a>(batches: &'a mut HashMap<String, Batch>, tag: &str) -> Option<&'a mut Batch> {
    if batches.contains_key(tag) {
        return batches.get_mut(tag);
    }
    for batch in batches.values_mut() {
        if let Some(found) = find_mut(&mut batch.nested, tag) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;

    fn line(s: &str) -> ParsedMessage {
        ParsedMessage::parse(s).unwrap()
    }

    #[test]
    fn unbatched_line_surfaces_immediately() {
        let mut framer = BatchFramer::new();
        let unit = framer.push(line("PRIVMSG #a :hi")).unwrap();
        assert!(matches!(unit, Unit::Message(_)));
    }

    #[test]
    fn simple_batch_surfaces_only_on_close() {
        let mut framer = BatchFramer::new();
        assert!(framer.push(line(":irc.host BATCH +tag example.com/foo")).is_none());
        assert!(framer.push(line("@batch=tag :nick!u@h PRIVMSG #c :Hi")).is_none());
        let unit = framer.push(line(":irc.host BATCH -tag")).unwrap();
        match unit {
            Unit::Batch(batch) => {
                assert_eq!(batch.kind, "example.com/foo");
                assert_eq!(batch.flatten().len(), 1);
            }
            Unit::Message(_) => panic!("expected a batch"),
        }
    }

    #[test]
    fn nested_batch_preserves_arrival_order() {
        let mut framer = BatchFramer::new();
        assert!(framer.push(line(":irc.host BATCH +outer example.com/foo")).is_none());
        assert!(framer.push(line("@batch=outer :irc.host BATCH +inner example.com/bar")).is_none());
        assert!(framer.push(line("@batch=inner :nick!u@h PRIVMSG #c :Hi")).is_none());
        assert!(framer.push(line("@batch=outer :irc.host BATCH -inner")).is_none());
        let unit = framer.push(line(":irc.host BATCH -outer")).unwrap();

        let Unit::Batch(outer) = unit else { panic!("expected a batch") };
        assert_eq!(outer.kind, "example.com/foo");
        assert_eq!(outer.nested.len(), 1);
        let inner = outer.nested.get("inner").unwrap();
        assert!(inner.closed);
        let flattened = outer.flatten();
        assert_eq!(flattened.len(), 1);
        assert_eq!(flattened[0].verb, "PRIVMSG");
    }

    #[test]
    fn interleaved_unbatched_lines_preserve_order_relative_to_each_other() {
        let mut framer = BatchFramer::new();
        let first = framer.push(line("PRIVMSG #a :one")).unwrap();
        let second = framer.push(line("PRIVMSG #a :two")).unwrap();
        match (first, second) {
            (Unit::Message(a), Unit::Message(b)) => {
                assert_eq!(a.args[1], "one");
                assert_eq!(b.args[1], "two");
            }
            _ => panic!("expected two messages"),
        }
    }
}
