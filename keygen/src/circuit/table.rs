use plonky2_field::types::Field;

/// A fixed lookup table with three value columns.
///
/// Lookup gates read rows of the table; the rows read are recorded so the sorted-list witness of
/// the lookup argument can be built later.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LookupTable<F: Field> {
    pub id: String,
    /// Index of the table inside its circuit, written into the fourth table column. Assigned when
    /// the table is added to a circuit; zero until then.
    pub table_index: usize,
    pub column_1: Vec<F>,
    pub column_2: Vec<F>,
    pub column_3: Vec<F>,
    lookup_reads: Vec<usize>,
}

impl<F: Field> LookupTable<F> {
    pub fn new(id: impl Into<String>, column_1: Vec<F>, column_2: Vec<F>, column_3: Vec<F>) -> Self {
        assert_eq!(column_1.len(), column_2.len());
        assert_eq!(column_1.len(), column_3.len());
        Self {
            id: id.into(),
            table_index: 0,
            column_1,
            column_2,
            column_3,
            lookup_reads: Vec::new(),
        }
    }

    pub fn from_rows(id: impl Into<String>, rows: &[[F; 3]]) -> Self {
        Self::new(
            id,
            rows.iter().map(|row| row[0]).collect(),
            rows.iter().map(|row| row[1]).collect(),
            rows.iter().map(|row| row[2]).collect(),
        )
    }

    /// The values `0..2^bits` in the first column, zero elsewhere.
    pub fn range(id: impl Into<String>, bits: usize) -> Self {
        let size = 1 << bits;
        Self::new(
            id,
            (0..size).map(F::from_canonical_usize).collect(),
            vec_zero(size),
            vec_zero(size),
        )
    }

    /// Every `(a, b, a ^ b)` for `a, b < 2^bits`.
    pub fn xor(id: impl Into<String>, bits: usize) -> Self {
        let side = 1usize << bits;
        let rows = (0..side)
            .flat_map(|a| (0..side).map(move |b| (a, b)))
            .map(|(a, b)| {
                [
                    F::from_canonical_usize(a),
                    F::from_canonical_usize(b),
                    F::from_canonical_usize(a ^ b),
                ]
            })
            .collect::<Vec<_>>();
        Self::from_rows(id, &rows)
    }

    pub fn len(&self) -> usize {
        self.column_1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.column_1.is_empty()
    }

    pub fn entry(&self, row: usize) -> Option<[F; 3]> {
        (row < self.len()).then(|| [self.column_1[row], self.column_2[row], self.column_3[row]])
    }

    /// Row of the first entry whose first column equals `key`.
    pub fn find_row(&self, key: F) -> Option<usize> {
        self.column_1.iter().position(|&value| value == key)
    }

    /// Rows read by lookup gates, in gate order.
    pub fn lookup_reads(&self) -> &[usize] {
        &self.lookup_reads
    }

    pub fn num_lookups(&self) -> usize {
        self.lookup_reads.len()
    }

    pub(crate) fn record_read(&mut self, row: usize) {
        self.lookup_reads.push(row);
    }
}

fn vec_zero<F: Field>(len: usize) -> Vec<F> {
    vec![F::ZERO; len]
}
