//! Solidity interfaces of the contracts the engine reads.
//!
//! The governor, token and timelock follow the OpenZeppelin Governor family.
//! The aggregator is the classic Multicall `aggregate`, which reverts as a whole
//! when any inner call fails.

use alloy_sol_types::sol;

sol! {
    interface IGovernor {
        event ProposalCreated(
            uint256 proposalId,
            address proposer,
            address[] targets,
            uint256[] values,
            string[] signatures,
            bytes[] calldatas,
            uint256 voteStart,
            uint256 voteEnd,
            string description
        );
        event VoteCast(address indexed voter, uint256 proposalId, uint8 support, uint256 weight, string reason);
        event VoteCastWithParams(
            address indexed voter,
            uint256 proposalId,
            uint8 support,
            uint256 weight,
            string reason,
            bytes params
        );
        event ProposalCanceled(uint256 proposalId);
        event ProposalQueued(uint256 proposalId, uint256 etaSeconds);
        event ProposalExecuted(uint256 proposalId);
        event ProposalCommented(uint256 indexed proposalId, address indexed member, string message);

        function name() external view returns (string memory);
        function state(uint256 proposalId) external view returns (uint8);
        function proposalSnapshot(uint256 proposalId) external view returns (uint256);
        function proposalDeadline(uint256 proposalId) external view returns (uint256);
        function proposalEta(uint256 proposalId) external view returns (uint256);
        function proposalVotes(uint256 proposalId)
            external
            view
            returns (uint256 againstVotes, uint256 forVotes, uint256 abstainVotes);
        function quorum(uint256 timepoint) external view returns (uint256);
        function votingDelay() external view returns (uint256);
        function votingPeriod() external view returns (uint256);
        function proposalThreshold() external view returns (uint256);
        function quorumNumerator() external view returns (uint256);
        function COUNTING_MODE() external view returns (string memory);
        function token() external view returns (address);
        function timelock() external view returns (address);
        function hashProposal(
            address[] targets,
            uint256[] values,
            bytes[] calldatas,
            bytes32 descriptionHash
        ) external pure returns (uint256);
        function propose(
            address[] targets,
            uint256[] values,
            bytes[] calldatas,
            string description
        ) external returns (uint256);
        function castVote(uint256 proposalId, uint8 support) external returns (uint256);
        function castVoteWithReason(uint256 proposalId, uint8 support, string reason) external returns (uint256);
    }

    interface IVotesToken {
        event DelegateChanged(address indexed delegator, address indexed fromDelegate, address indexed toDelegate);

        function name() external view returns (string memory);
        function symbol() external view returns (string memory);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 value) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool);
        function transferFrom(address from, address to, uint256 value) external returns (bool);
        function delegates(address account) external view returns (address);
        function getVotes(address account) external view returns (uint256);
        function getPastTotalSupply(uint256 timepoint) external view returns (uint256);
        function owner() external view returns (address);
    }

    interface ITimelock {
        function TIMELOCK_ADMIN_ROLE() external view returns (bytes32);
        function PROPOSER_ROLE() external view returns (bytes32);
        function EXECUTOR_ROLE() external view returns (bytes32);
        function CANCELLER_ROLE() external view returns (bytes32);
        function getMinDelay() external view returns (uint256);
        function hasRole(bytes32 role, address account) external view returns (bool);
        function hashOperation(
            address target,
            uint256 value,
            bytes data,
            bytes32 predecessor,
            bytes32 salt
        ) external pure returns (bytes32);
        function schedule(
            address target,
            uint256 value,
            bytes data,
            bytes32 predecessor,
            bytes32 salt,
            uint256 delay
        ) external;
        function execute(
            address target,
            uint256 value,
            bytes payload,
            bytes32 predecessor,
            bytes32 salt
        ) external payable;
    }

    interface IDaoRegistry {
        function daoCount() external view returns (uint256);
        function daoAt(uint256 index) external view returns (address governor);
        function registerDao(address governor, address token, address timelock) external;
    }

    interface IMulticall {
        struct Call {
            address target;
            bytes callData;
        }

        function aggregate(Call[] calls) external returns (uint256 blockNumber, bytes[] returnData);
        function getEthBalance(address addr) external view returns (uint256 balance);
    }
}
