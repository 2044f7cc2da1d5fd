//! Access policies: trees of threshold gates over attributes.
//!
//! A [`Policy`] is the recursive description a caller builds, an [`AccessTree`] is its validated
//! form. The tree is stored as an arena in pre-order: the root has id `0` and every parent has a
//! smaller id than its children. Each node remembers its parent and its 1-based position among
//! its siblings, which is the x-coordinate used for secret sharing and Lagrange interpolation.

use crate::util::{eval_poly, lagrange_coefficient, rand_scalar, SecretScalar};
use crate::wire::{put_u32, Compress, Reader};
use crate::{Attribute, AttributeSet, Config, Error};
use alloc::collections::BTreeSet;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use irmaseal_curve::Scalar;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

/// Position of a node in an [`AccessTree`].
pub type NodeId = usize;

/// Id of the root node.
pub const ROOT: NodeId = 0;

const TAG_LEAF: u8 = 0;
const TAG_GATE: u8 = 1;

/// Recursive description of an access policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Policy {
    /// Satisfied iff the attribute is present.
    Leaf(Attribute),
    /// Satisfied iff at least `k` of the children are satisfied.
    Threshold { k: usize, children: Vec<Policy> },
}

impl Policy {
    pub fn leaf(attr: impl Into<Attribute>) -> Self {
        Policy::Leaf(attr.into())
    }

    pub fn threshold(k: usize, children: Vec<Policy>) -> Self {
        Policy::Threshold { k, children }
    }

    /// All children must be satisfied.
    pub fn and(children: Vec<Policy>) -> Self {
        Policy::Threshold {
            k: children.len(),
            children,
        }
    }

    /// One child must be satisfied.
    pub fn or(children: Vec<Policy>) -> Self {
        Policy::Threshold { k: 1, children }
    }

    fn write_bytes(&self, out: &mut Vec<u8>) {
        match self {
            Policy::Leaf(attr) => {
                out.push(TAG_LEAF);
                attr.write_bytes(out);
            }
            Policy::Threshold { k, children } => {
                out.push(TAG_GATE);
                put_u32(out, *k);
                put_u32(out, children.len());
                for child in children {
                    child.write_bytes(out);
                }
            }
        }
    }

    fn read_bytes(reader: &mut Reader<'_>, depth: usize, max_depth: usize) -> Result<Self, Error> {
        if depth > max_depth {
            return Err(Error::PolicyTooDeep);
        }

        match reader.u8()? {
            TAG_LEAF => Ok(Policy::Leaf(Attribute::read_bytes(reader)?)),
            TAG_GATE => {
                let k = reader.length()?;
                let n = reader.length()?;
                let mut children = Vec::new();
                for _ in 0..n {
                    children.push(Policy::read_bytes(reader, depth + 1, max_depth)?);
                }
                Ok(Policy::Threshold { k, children })
            }
            _ => Err(Error::Malformed),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Leaf(attr) => write!(f, "{}", attr),
            Policy::Threshold { k, children } => {
                let n = children.len();
                let sep = if n > 1 && *k == n {
                    " AND "
                } else if n > 1 && *k == 1 {
                    " OR "
                } else {
                    write!(f, "{}of{}", k, n)?;
                    ", "
                };

                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Leaf(Attribute),
    Gate { threshold: u32, children: Vec<NodeId> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    parent: Option<NodeId>,
    index: u32,
    kind: NodeKind,
}

impl Node {
    /// Parent of this node, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// 1-based position among the siblings, `0` for the root.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn attribute(&self) -> Option<&Attribute> {
        match &self.kind {
            NodeKind::Leaf(attr) => Some(attr),
            NodeKind::Gate { .. } => None,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Leaf(_) => &[],
            NodeKind::Gate { children, .. } => children,
        }
    }
}

/// A validated, immutable access tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessTree {
    nodes: Vec<Node>,
    depth: usize,
}

impl AccessTree {
    /// Builds a tree with the default [`Config`].
    pub fn new(policy: &Policy) -> Result<Self, Error> {
        Self::with_config(policy, &Config::default())
    }

    /// Builds a tree, rejecting malformed gates and policies deeper than
    /// `config.max_policy_depth`.
    pub fn with_config(policy: &Policy, config: &Config) -> Result<Self, Error> {
        let mut tree = AccessTree {
            nodes: Vec::new(),
            depth: 0,
        };
        tree.push(policy, None, 0, 1, config.max_policy_depth)?;

        Ok(tree)
    }

    fn push(
        &mut self,
        policy: &Policy,
        parent: Option<NodeId>,
        index: u32,
        depth: usize,
        max_depth: usize,
    ) -> Result<NodeId, Error> {
        if depth > max_depth {
            return Err(Error::PolicyTooDeep);
        }
        self.depth = self.depth.max(depth);

        let id = self.nodes.len();
        match policy {
            Policy::Leaf(attr) => self.nodes.push(Node {
                parent,
                index,
                kind: NodeKind::Leaf(attr.clone()),
            }),
            Policy::Threshold { k, children } => {
                if children.is_empty() {
                    return Err(Error::InvalidPolicy("gate without children"));
                }
                if *k == 0 || *k > children.len() {
                    return Err(Error::InvalidPolicy("threshold outside [1, n]"));
                }
                if children.len() > u32::MAX as usize {
                    return Err(Error::InvalidPolicy("too many children"));
                }

                self.nodes.push(Node {
                    parent,
                    index,
                    kind: NodeKind::Gate {
                        threshold: *k as u32,
                        children: Vec::new(),
                    },
                });

                let mut ids = Vec::with_capacity(children.len());
                for (i, child) in children.iter().enumerate() {
                    ids.push(self.push(child, Some(id), i as u32 + 1, depth + 1, max_depth)?);
                }

                if let NodeKind::Gate { children, .. } = &mut self.nodes[id].kind {
                    *children = ids;
                }
            }
        }

        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nesting depth, a single leaf has depth 1.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Leaves in left-to-right order.
    pub fn leaves(&self) -> impl Iterator<Item = (NodeId, &Attribute)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, node)| node.attribute().map(|attr| (id, attr)))
    }

    /// Distinct attributes mentioned by the tree.
    pub fn attributes(&self) -> BTreeSet<&Attribute> {
        self.leaves().map(|(_, attr)| attr).collect()
    }

    /// Recovers the recursive description of this tree.
    pub fn to_policy(&self) -> Policy {
        self.policy_at(ROOT)
    }

    fn policy_at(&self, id: NodeId) -> Policy {
        match &self.nodes[id].kind {
            NodeKind::Leaf(attr) => Policy::Leaf(attr.clone()),
            NodeKind::Gate {
                threshold,
                children,
            } => Policy::Threshold {
                k: *threshold as usize,
                children: children.iter().map(|c| self.policy_at(*c)).collect(),
            },
        }
    }

    pub fn is_satisfied(&self, attrs: &AttributeSet) -> bool {
        self.witness(attrs).is_some()
    }

    /// Evaluates the tree bottom-up against `attrs`.
    ///
    /// Every satisfied gate selects exactly `k` satisfied children, lowest indices first.
    /// Returns `None` if the root is not satisfied.
    pub fn witness(&self, attrs: &AttributeSet) -> Option<Witness> {
        self.witness_by(attrs, |satisfied, k| satisfied[..k].to_vec())
    }

    /// Like [`Self::witness`], with the choice of `k` children out of the satisfied ones
    /// (given in index order) left to `pick`.
    pub(crate) fn witness_by<F>(&self, attrs: &AttributeSet, pick: F) -> Option<Witness>
    where
        F: Fn(&[NodeId], usize) -> Vec<NodeId>,
    {
        let mut satisfied = vec![false; self.nodes.len()];
        let mut chosen = vec![Vec::new(); self.nodes.len()];

        // Children always follow their parent in pre-order.
        for id in (0..self.nodes.len()).rev() {
            match &self.nodes[id].kind {
                NodeKind::Leaf(attr) => satisfied[id] = attrs.contains(attr),
                NodeKind::Gate {
                    threshold,
                    children,
                } => {
                    let ok: Vec<NodeId> =
                        children.iter().copied().filter(|c| satisfied[*c]).collect();
                    let k = *threshold as usize;
                    if ok.len() >= k {
                        chosen[id] = pick(&ok, k);
                        satisfied[id] = true;
                    }
                }
            }
        }

        if satisfied[ROOT] {
            Some(Witness { chosen })
        } else {
            None
        }
    }

    /// Shamir-shares `secret` down the tree, top-down.
    ///
    /// Every gate with threshold `k` gets a fresh random polynomial of degree `k - 1` whose
    /// constant term is the share handed down by its parent. Returns `q_x(0)` for every node.
    pub(crate) fn share_secret<R: RngCore + CryptoRng>(
        &self,
        secret: Scalar,
        rng: &mut R,
    ) -> Result<Zeroizing<Vec<SecretScalar>>, Error> {
        let mut shares = Zeroizing::new(vec![SecretScalar::default(); self.nodes.len()]);
        let mut coeffs: Zeroizing<Vec<SecretScalar>> = Zeroizing::new(Vec::new());
        shares[ROOT] = SecretScalar(secret);

        for (id, node) in self.nodes.iter().enumerate() {
            if let NodeKind::Gate {
                threshold,
                children,
            } = &node.kind
            {
                coeffs.clear();
                coeffs.push(shares[id]);
                for _ in 1..*threshold {
                    coeffs.push(SecretScalar(rand_scalar(rng)?));
                }

                for &child in children {
                    let x = Scalar::from(u64::from(self.nodes[child].index));
                    shares[child] = SecretScalar(eval_poly(&coeffs, x));
                }
            }
        }

        Ok(shares)
    }
}

impl AccessTree {
    /// Decodes a tree that may nest up to `config.max_policy_depth` levels.
    ///
    /// Trees built with [`AccessTree::with_config`] need the same config to be decoded again.
    pub fn read_with_config(reader: &mut Reader<'_>, config: &Config) -> Result<Self, Error> {
        let policy = Policy::read_bytes(reader, 1, config.max_policy_depth)?;

        AccessTree::with_config(&policy, config)
    }
}

impl TryFrom<&Policy> for AccessTree {
    type Error = Error;

    fn try_from(policy: &Policy) -> Result<Self, Error> {
        AccessTree::new(policy)
    }
}

impl fmt::Display for AccessTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_policy())
    }
}

/// Pre-order encoding: a leaf is `0 ‖ attribute`, a gate is `1 ‖ k ‖ n ‖ children`.
impl Compress for AccessTree {
    fn write_bytes(&self, out: &mut Vec<u8>) {
        self.to_policy().write_bytes(out);
    }

    /// Decodes with the default [`Config`], see [`AccessTree::read_with_config`].
    fn read_bytes(reader: &mut Reader<'_>) -> Result<Self, Error> {
        AccessTree::read_with_config(reader, &Config::default())
    }
}

/// A satisfying subtree: the children each satisfied gate uses for reconstruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Witness {
    chosen: Vec<Vec<NodeId>>,
}

impl Witness {
    /// Children selected at `id`, empty for leaves and unused gates.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.chosen.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Leaves that take part in the reconstruction, in left-to-right order.
    pub fn leaves(&self, tree: &AccessTree) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            match tree.nodes[id].kind {
                NodeKind::Leaf(_) => leaves.push(id),
                NodeKind::Gate { .. } => stack.extend(self.children(id)),
            }
        }
        leaves.sort_unstable();
        leaves
    }

    /// Lagrange weight of every used leaf: the product of the basis coefficients
    /// `Δ_{index(z), S}(0)` along the path from the root.
    ///
    /// Fails if the witness was not produced for `tree`.
    pub fn coefficients(&self, tree: &AccessTree) -> Result<Vec<(NodeId, Scalar)>, Error> {
        if self.chosen.len() != tree.len() {
            return Err(Error::InvalidPolicy("witness does not match the tree"));
        }

        let mut res = Vec::new();
        let mut stack = vec![(ROOT, Scalar::one())];
        while let Some((id, weight)) = stack.pop() {
            match &tree.nodes[id].kind {
                NodeKind::Leaf(_) => res.push((id, weight)),
                NodeKind::Gate { threshold, .. } => {
                    let chosen = &self.chosen[id];
                    if chosen.len() != *threshold as usize
                        || chosen.iter().any(|c| tree.node(*c).and_then(Node::parent) != Some(id))
                    {
                        return Err(Error::InvalidPolicy("witness does not match the tree"));
                    }

                    let xs: Vec<u32> = chosen.iter().map(|c| tree.nodes[*c].index).collect();
                    for (&child, &x) in chosen.iter().zip(xs.iter()) {
                        stack.push((child, weight * lagrange_coefficient(x, &xs)?));
                    }
                }
            }
        }
        res.sort_unstable_by_key(|(id, _)| *id);

        Ok(res)
    }
}
