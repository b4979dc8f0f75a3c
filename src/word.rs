use crate::vocab::TokenId;

/// A sequence of token ids that merges are applied to, during both training and encoding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Word {
    tokens: Vec<TokenId>,
}

impl Word {
    /// Builds a word holding one byte-token id per input byte.
    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            tokens: bytes.iter().map(|&b| TokenId::from(b)).collect(),
        }
    }

    pub(crate) fn ids(&self) -> &[TokenId] {
        &self.tokens
    }

    /// Returns true when the word contains at least two tokens.
    pub(crate) fn has_pairs(&self) -> bool {
        self.tokens.len() >= 2
    }

    /// Invokes `f(position, left, right)` for each adjacent pair, left to right.
    pub(crate) fn for_each_pair<F>(&self, mut f: F)
    where
        F: FnMut(usize, TokenId, TokenId),
    {
        for (pos, window) in self.tokens.windows(2).enumerate() {
            f(pos, window[0], window[1]);
        }
    }

    /// Replaces every adjacent pair whose concatenated bytes equal `target` with
    /// `replacement`, scanning left to right without overlap.
    ///
    /// Matching is on bytes rather than ids: two different id pairs that spell
    /// the same token are both merged. Returns the number of replacements.
    pub(crate) fn merge<'a, F>(&mut self, target: &[u8], replacement: TokenId, resolve: F) -> usize
    where
        F: Fn(TokenId) -> &'a [u8],
    {
        if self.tokens.len() < 2 {
            return 0;
        }

        let len = self.tokens.len();
        let mut read = 0usize;
        let mut write = 0usize;
        let mut merges = 0usize;
        while read < len {
            if read + 1 < len
                && spells(target, resolve(self.tokens[read]), resolve(self.tokens[read + 1]))
            {
                self.tokens[write] = replacement;
                read += 2;
                merges += 1;
            } else {
                self.tokens[write] = self.tokens[read];
                read += 1;
            }
            write += 1;
        }
        self.tokens.truncate(write);
        merges
    }
}

fn spells(target: &[u8], left: &[u8], right: &[u8]) -> bool {
    left.len() + right.len() == target.len()
        && target.starts_with(left)
        && &target[left.len()..] == right
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::Vocabulary;

    #[test]
    fn merge_is_greedy_and_non_overlapping() {
        let vocab = Vocabulary::with_byte_tokens();
        let mut word = Word::from_bytes(b"aaaa a");
        let merges = word.merge(b"aa", 300, |id| vocab.lookup_token(id).unwrap_or_default());
        assert_eq!(merges, 2);
        assert_eq!(word.ids(), &[300, 300, 32, 97]);

        let mut odd = Word::from_bytes(b"aaa");
        odd.merge(b"aa", 300, |id| vocab.lookup_token(id).unwrap_or_default());
        assert_eq!(odd.ids(), &[300, 97]);
    }

    #[test]
    fn merge_matches_any_pair_spelling_the_target() {
        let mut vocab = Vocabulary::with_byte_tokens();
        let ab = vocab.learn(b"ab".to_vec()).expect("ab");
        let bc = vocab.learn(b"bc".to_vec()).expect("bc");
        let abc = vocab.learn(b"abc".to_vec()).expect("abc");
        let mut word = Word {
            tokens: vec![ab, 99, 97, bc, 120],
        };
        let merges = word.merge(b"abc", abc, |id| vocab.lookup_token(id).unwrap_or_default());
        assert_eq!(merges, 2);
        assert_eq!(word.ids(), &[abc, abc, 120]);
    }

    #[test]
    fn enumerate_pairs_in_order() {
        let word = Word::from_bytes(b"xyz");
        assert!(word.has_pairs());
        let mut collected = Vec::new();
        word.for_each_pair(|pos, l, r| collected.push((pos, l, r)));
        assert_eq!(collected, vec![(0, 120, 121), (1, 121, 122)]);
        assert!(!Word::from_bytes(b"x").has_pairs());
    }
}
