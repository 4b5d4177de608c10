//! Table keys and column names of the banking source data.
//!
//! The names are the source files' own headers. Derived columns are
//! named in the same language so exported files stay consistent.

// ── Table keys ──────────────────────────────────────────────────────
pub const BRANCHES: &str = "agencias";
pub const COLLABORATOR_BRANCHES: &str = "colaborador_agencia";
pub const COLLABORATORS: &str = "colaboradores";
pub const ACCOUNTS: &str = "contas";
pub const PROPOSALS: &str = "propostas_credito";
pub const TRANSACTIONS: &str = "transacoes";
pub const CLIENTS: &str = "clientes";

// ── Shared ──────────────────────────────────────────────────────────
pub const STATE_CODE: &str = "uf";
pub const STATE_NAME: &str = "nome_estado";
pub const FIRST_NAME: &str = "primeiro_nome";
pub const LAST_NAME: &str = "ultimo_nome";
pub const FULL_NAME: &str = "nome_completo";

// ── Clients ─────────────────────────────────────────────────────────
pub const CLIENT_CODE: &str = "cod_cliente";
pub const ADDRESS: &str = "endereco";
pub const CLIENT_TYPE: &str = "tipo_cliente";
pub const CLIENT_TYPE_LABEL: &str = "tipo_cliente_descricao";
pub const INCLUSION_DATE: &str = "data_inclusao";
pub const TENURE_MONTHS: &str = "tempo_como_cliente_meses";
pub const BIRTH_DATE: &str = "data_nascimento";
pub const AGE: &str = "idade";

// ── Branches ────────────────────────────────────────────────────────
pub const BRANCH_CODE: &str = "cod_agencia";
pub const MEAN_BALANCE: &str = "saldo_medio";
pub const ACCOUNT_COUNT: &str = "num_contas";
pub const TRANSACTION_VOLUME: &str = "volume_transacoes";

// ── Accounts ────────────────────────────────────────────────────────
pub const ACCOUNT_NUMBER: &str = "num_conta";
pub const ACCOUNT_TYPE: &str = "tipo_conta";
pub const ACCOUNT_TYPE_LABEL: &str = "tipo_conta_descricao";
pub const AVAILABLE_BALANCE: &str = "saldo_disponivel";

// ── Transactions ────────────────────────────────────────────────────
pub const TRANSACTION_DATE: &str = "data_transacao";
pub const PERIOD: &str = "mes_ano";
pub const AMOUNT: &str = "valor_transacao";
pub const MEAN_AMOUNT_PER_ACCOUNT: &str = "valor_medio_conta";
pub const AMOUNT_TO_BALANCE: &str = "valor_vs_saldo";
pub const FREQUENCY_PER_ACCOUNT: &str = "freq_transacoes";
/// Suffix that disambiguates the monthly total from the source amount.
pub const MONTHLY_TOTAL_SUFFIX: &str = "_evolucao";
pub const MONTHLY_TOTAL: &str = "valor_transacao_evolucao";

// ── Proposals ───────────────────────────────────────────────────────
pub const PROPOSAL_ID: &str = "cod_proposta";
pub const COLLABORATOR_CODE: &str = "cod_colaborador";
pub const PROPOSAL_STATUS: &str = "status_proposta";
pub const PROPOSAL_VALUE: &str = "valor_proposta";
pub const APPROVAL_RATE_COLLAB: &str = "taxa_aprovacao_colab";
pub const APPROVAL_RATE_CLIENT: &str = "taxa_aprovacao_cliente";
pub const MEAN_VALUE_STATUS_CLIENT: &str = "media_status_cliente";
pub const PROPOSALS_PER_CLIENT: &str = "total_propostas_cliente";
pub const DEVIATION_FROM_CLIENT_MEAN: &str = "diferenca_media_cliente";
