use super::{BlockReader, BlockWriter, CodecError, ColumnData, ColumnType};
use tokio::io::AsyncRead;

/// First server revision that prefixes blocks with a block-info section.
pub const MIN_REVISION_WITH_BLOCK_INFO: u64 = 51903;

/// A named, typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub data: ColumnData,
}

/// A unit of tabular data: columns of equal length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    columns: Vec<Column>,
    rows: usize,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column typed after its values.
    pub fn add_column(&mut self, name: impl Into<String>, data: ColumnData) -> Result<(), CodecError> {
        let ty = data.column_type();
        self.add_typed_column(name, ty, data)
    }

    /// Append a column with an explicit wire type, e.g. `DateTime('UTC')`.
    pub fn add_typed_column(
        &mut self,
        name: impl Into<String>,
        column_type: ColumnType,
        data: ColumnData,
    ) -> Result<(), CodecError> {
        let name = name.into();
        column_type.check(&data)?;
        if !self.columns.is_empty() && data.len() != self.rows {
            return Err(CodecError::RowCountMismatch {
                column: name,
                expected: self.rows,
                actual: data.len(),
            });
        }
        self.rows = data.len();
        self.columns.push(Column {
            name,
            column_type,
            data,
        });
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, idx: usize) -> Option<&Column> {
        self.columns.get(idx)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn encode(&self, w: &mut BlockWriter, revision: u64) -> Result<(), CodecError> {
        if revision >= MIN_REVISION_WITH_BLOCK_INFO {
            // is_overflows = false, bucket_num = -1, terminator
            w.put_uvarint(1);
            w.put_bool(false);
            w.put_uvarint(2);
            w.put_i32(-1);
            w.put_uvarint(0);
        }
        w.put_uvarint(self.columns.len() as u64);
        w.put_uvarint(self.rows as u64);
        for column in &self.columns {
            if column.data.len() != self.rows {
                return Err(CodecError::RowCountMismatch {
                    column: column.name.clone(),
                    expected: self.rows,
                    actual: column.data.len(),
                });
            }
            w.put_str(&column.name);
            w.put_str(&column.column_type.to_string());
            column.data.encode(w);
        }
        Ok(())
    }

    /// Decode the next block, or `None` if the stream ended cleanly before one.
    pub async fn decode<R: AsyncRead + Unpin>(
        r: &mut BlockReader<R>,
        revision: u64,
    ) -> Result<Option<Block>, CodecError> {
        if r.is_eof().await? {
            return Ok(None);
        }
        if revision >= MIN_REVISION_WITH_BLOCK_INFO {
            loop {
                match r.read_uvarint().await? {
                    0 => break,
                    1 => {
                        r.read_bool().await?;
                    }
                    2 => {
                        r.read_i32().await?;
                    }
                    other => return Err(CodecError::UnknownBlockInfoField(other)),
                }
            }
        }
        let num_columns = r.read_len().await?;
        let num_rows = r.read_len().await?;
        let mut block = Block::new();
        for _ in 0..num_columns {
            let name = r.read_string("column name").await?;
            let type_name = r.read_string("column type").await?;
            let column_type = ColumnType::parse(&type_name)?;
            let data = ColumnData::decode(r, &column_type, num_rows, &name).await?;
            block.add_typed_column(name, column_type, data)?;
        }
        block.rows = num_rows;
        Ok(Some(block))
    }
}
